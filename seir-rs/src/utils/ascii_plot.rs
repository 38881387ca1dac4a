use std::iter;

use crate::prelude::{Real, INF};

/// ASCII plot of a sequence of positive values.
///
/// Draw each point as a column filled with '*'s up to the maximum height.
pub fn plot_vbars(values: &[Real], height: usize) -> String {
    let mut out = String::new();
    if values.is_empty() || height == 0 {
        return out;
    }
    let max = values.iter().cloned().fold(-INF, |x, y| x.max(y));
    let step = max / height as Real;

    for i in 0..height + 1 {
        let h = (height - i) as Real * step;
        out.extend(values.iter().map(|&x| if x >= h { '*' } else { ' ' }));
        out.push('\n');
    }
    out
}

/// Observed and simulated series as pairs of horizontal bars sharing the
/// same scale. Observed bars use '=' and simulated bars use '#'.
pub fn plot_comparison(times: &[i64], observed: &[Real], simulated: &[Real], width: usize) -> String {
    let mut out = String::new();
    let max = observed
        .iter()
        .chain(simulated)
        .cloned()
        .filter(|x| x.is_finite())
        .fold(0.0, Real::max);
    let step = if max > 0.0 { max / width.max(1) as Real } else { 1.0 };
    let bar = |x: Real, c: char| -> String {
        let n = if x > 0.0 { (x / step).round() as usize } else { 0 };
        iter::repeat(c).take(n).collect()
    };

    for ((t, &y), &x) in times.iter().zip(observed).zip(simulated) {
        out.push_str(&format!("{:>4} |{} {}\n", t, bar(y, '='), y));
        out.push_str(&format!("     |{} {:.1}\n", bar(x, '#'), x));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vbars_shape() {
        let plot = plot_vbars(&[1.0, 2.0], 2);
        assert_eq!(plot, " *\n**\n**\n");
    }

    #[test]
    fn comparison_scales_to_largest_value() {
        let plot = plot_comparison(&[1, 2], &[10.0, 5.0], &[5.0, 0.0], 10);
        let lines: Vec<&str> = plot.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "   1 |========== 10");
        assert_eq!(lines[1], "     |##### 5.0");
        assert_eq!(lines[3], "     | 0.0");
    }
}
