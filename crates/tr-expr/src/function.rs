use std::f64::consts;

/// Elementwise functions callable as `name(expr)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryFunction {
    Abs,
    Round,
    Floor,
    Ceil,
    Sign,
    Exp,
    Log,
    Log10,
    Square,
    Sqrt,
    Cbrt,
    Degrees,
    Radians,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
}

impl UnaryFunction {
    pub const ALL: [Self; 25] = [
        Self::Abs,
        Self::Round,
        Self::Floor,
        Self::Ceil,
        Self::Sign,
        Self::Exp,
        Self::Log,
        Self::Log10,
        Self::Square,
        Self::Sqrt,
        Self::Cbrt,
        Self::Degrees,
        Self::Radians,
        Self::Sin,
        Self::Cos,
        Self::Tan,
        Self::Asin,
        Self::Acos,
        Self::Atan,
        Self::Sinh,
        Self::Cosh,
        Self::Tanh,
        Self::Asinh,
        Self::Acosh,
        Self::Atanh,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Round => "round",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Sign => "sign",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Log10 => "log10",
            Self::Square => "square",
            Self::Sqrt => "sqrt",
            Self::Cbrt => "cbrt",
            Self::Degrees => "degrees",
            Self::Radians => "radians",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Asinh => "asinh",
            Self::Acosh => "acosh",
            Self::Atanh => "atanh",
        }
    }

    /// Case-insensitive lookup; `ln`, `todegrees` and `toradians` are accepted aliases.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        let lowered = name.to_ascii_lowercase();
        match lowered.as_str() {
            "ln" => Some(Self::Log),
            "todegrees" => Some(Self::Degrees),
            "toradians" => Some(Self::Radians),
            other => Self::ALL.into_iter().find(|f| f.name() == other),
        }
    }

    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Abs => x.abs(),
            Self::Round => x.round(),
            Self::Floor => x.floor(),
            Self::Ceil => x.ceil(),
            Self::Sign => {
                if x == 0.0 || x.is_nan() {
                    x
                } else {
                    x.signum()
                }
            }
            Self::Exp => x.exp(),
            Self::Log => x.ln(),
            Self::Log10 => x.log10(),
            Self::Square => x * x,
            Self::Sqrt => x.sqrt(),
            Self::Cbrt => x.cbrt(),
            Self::Degrees => x.to_degrees(),
            Self::Radians => x.to_radians(),
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Asin => x.asin(),
            Self::Acos => x.acos(),
            Self::Atan => x.atan(),
            Self::Sinh => x.sinh(),
            Self::Cosh => x.cosh(),
            Self::Tanh => x.tanh(),
            Self::Asinh => x.asinh(),
            Self::Acosh => x.acosh(),
            Self::Atanh => x.atanh(),
        }
    }
}

/// Reserved variable names with built-in values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedConstant {
    Pi,
    E,
    /// Independent uniform samples in `[0, 1)`, one per row.
    Random,
}

impl NamedConstant {
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "PI" => Some(Self::Pi),
            "E" => Some(Self::E),
            "RANDOM" => Some(Self::Random),
            _ => None,
        }
    }

    /// Broadcast value; `None` for [`NamedConstant::Random`].
    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Pi => Some(consts::PI),
            Self::E => Some(consts::E),
            Self::Random => None,
        }
    }
}
