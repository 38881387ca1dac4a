/// Implements ParamSet for a struct of Real fields and creates a builder
/// method `with_<field>` for each of them.
///
/// Each field is listed with the public name used by configuration files and
/// by the optimizer, e.g. `pop => "N"`.
#[macro_export]
macro_rules! param_set {
    ($ty:ident { $($field:ident => $name:literal),* $(,)? }, validate = $validate:path) => {
        impl $crate::params::ParamSet for $ty {
            const NAMES: &'static [&'static str] = &[$($name),*];

            fn get(&self, name: &str) -> Option<$crate::Real> {
                match name {
                    $($name => Some(self.$field),)*
                    _ => None,
                }
            }

            fn set(&mut self, name: &str, value: $crate::Real) -> $crate::Result<()> {
                match name {
                    $($name => {
                        self.$field = value;
                        Ok(())
                    })*
                    _ => Err($crate::Error::UnknownParameter(name.to_string())),
                }
            }

            fn validate(&self) -> $crate::Result<()> {
                $validate(self)
            }
        }

        paste::paste! {
            impl $ty {
                $(
                    pub fn [<with_ $field>](mut self, value: $crate::Real) -> Self {
                        self.$field = value;
                        self
                    }
                )*
            }
        }
    };
}
