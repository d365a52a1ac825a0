use std::fmt;
use std::str::FromStr;

/// Letter grade, ordered from highest to lowest.
///
/// Each grade carries a grade-point weight used for GPA computation.
/// A failing grade carries zero points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    A,
    AMinus,
    BPlus,
    B,
    C,
    D,
    E,
    F,
}

impl Grade {
    /// All grades, highest first.
    pub const ALL: [Grade; 8] = [
        Grade::A,
        Grade::AMinus,
        Grade::BPlus,
        Grade::B,
        Grade::C,
        Grade::D,
        Grade::E,
        Grade::F,
    ];

    /// Grade-point weight.
    pub fn points(self) -> u32 {
        match self {
            Grade::A => 10,
            Grade::AMinus => 9,
            Grade::BPlus => 8,
            Grade::B => 7,
            Grade::C => 6,
            Grade::D => 5,
            Grade::E => 4,
            Grade::F => 0,
        }
    }

    /// Short transcript label (`A`, `A-`, `B+`, ...).
    pub fn label(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grade {0:?} (expected one of A, A-, B+, B, C, D, E, F)")]
pub struct ParseGradeError(pub String);

impl FromStr for Grade {
    type Err = ParseGradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let grade = match s.trim().to_ascii_uppercase().as_str() {
            "A" => Grade::A,
            "A-" | "A_MINUS" => Grade::AMinus,
            "B+" | "B_PLUS" => Grade::BPlus,
            "B" => Grade::B,
            "C" => Grade::C,
            "D" => Grade::D,
            "E" => Grade::E,
            "F" => Grade::F,
            _ => return Err(ParseGradeError(s.to_string())),
        };
        Ok(grade)
    }
}
