/// Numeric error codes shared by the scheduler and the CLI exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    GeneralError = 1,
    ParseError = 2,
    ValidationError = 3,
    DependencyError = 11,
    CircularDependency = 12,
    ConfigError = 20,
    Timeout = 30,
    Cancelled = 31,
    CheckpointError = 40,
    InternalError = 50,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Process exit status for this code.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::GeneralError => 1,
            Self::ParseError | Self::ValidationError => 3,
            Self::DependencyError | Self::CircularDependency => 3,
            Self::ConfigError => 11,
            Self::Timeout => 30,
            Self::Cancelled => 31,
            Self::CheckpointError => 40,
            Self::InternalError => 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_group_validation_errors() {
        assert_eq!(ErrorCode::CircularDependency.exit_code(), 3);
        assert_eq!(ErrorCode::DependencyError.exit_code(), 3);
        assert_eq!(ErrorCode::Timeout.exit_code(), 30);
        assert_eq!(ErrorCode::CircularDependency.as_u16(), 12);
    }
}
