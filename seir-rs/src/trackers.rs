/// Trait that implements a method that tracks some value of type T and
/// perform some action like collecting records, logging progress, etc.
///
/// The tracker receives an immutable reference to the tracked value. The
/// optimizers call their tracker once per objective evaluation and never read
/// anything back from it.
///
/// Closures can be used as trackers through the [`FnTracker`] wrapper and
/// trackers can be combined with tuples.
pub trait Tracker<T> {
    /// Track value.
    fn track(&mut self, value: &T);

    /// Choose to execute tracker at iteration n if tracker must execute every
    /// freq frames with given possibly non-null offset.
    fn maybe_track(&mut self, value: &T, n: usize, freq: usize, offset: usize) {
        if n >= offset && ((n - offset) % freq.max(1)) == 0 {
            self.track(value);
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
// Tracker instances
/////////////////////////////////////////////////////////////////////////////

impl<T, R1, R2> Tracker<T> for (R1, R2)
where
    R1: Tracker<T>,
    R2: Tracker<T>,
{
    fn track(&mut self, value: &T) {
        self.0.track(value);
        self.1.track(value);
    }
}

impl<T, R1, R2, R3> Tracker<T> for (R1, R2, R3)
where
    R1: Tracker<T>,
    R2: Tracker<T>,
    R3: Tracker<T>,
{
    fn track(&mut self, value: &T) {
        self.0.track(value);
        self.1.track(value);
        self.2.track(value);
    }
}

impl<T> Tracker<T> for () {
    fn track(&mut self, _: &T) {}
}

impl<T, R: Tracker<T> + ?Sized> Tracker<T> for &mut R {
    fn track(&mut self, value: &T) {
        (**self).track(value);
    }
}

/// Collects a copy of every tracked value.
impl<T: Clone> Tracker<T> for Vec<T> {
    fn track(&mut self, value: &T) {
        self.push(value.clone());
    }
}

/////////////////////////////////////////////////////////////////////////////
// Wrappers
/////////////////////////////////////////////////////////////////////////////

/// Wraps a closure.
pub struct FnTracker<F>(pub F);

impl<T, F> Tracker<T> for FnTracker<F>
where
    F: FnMut(&T),
{
    fn track(&mut self, value: &T) {
        (&mut self.0)(value)
    }
}

/// Only forwards every freq-th value to the inner tracker.
pub struct Every<R> {
    inner: R,
    freq: usize,
    count: usize,
}

impl<R> Every<R> {
    pub fn new(freq: usize, inner: R) -> Self {
        Every {
            inner,
            freq,
            count: 0,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<T, R: Tracker<T>> Tracker<T> for Every<R> {
    fn track(&mut self, value: &T) {
        self.inner.maybe_track(value, self.count, self.freq, 0);
        self.count += 1;
    }
}
