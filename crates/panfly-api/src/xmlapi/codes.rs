// Response codes carried in the envelope's `code` attribute.

pub const UNKNOWN_COMMAND: u16 = 1;
pub const BAD_XPATH: u16 = 6;
pub const OBJECT_NOT_PRESENT: u16 = 7;
pub const OBJECT_NOT_UNIQUE: u16 = 8;
pub const REFERENCE_COUNT_NOT_ZERO: u16 = 10;
pub const INTERNAL_ERROR: u16 = 11;
pub const INVALID_OBJECT: u16 = 12;
pub const OPERATION_NOT_POSSIBLE: u16 = 14;
pub const OPERATION_DENIED: u16 = 15;
pub const UNAUTHORIZED: u16 = 16;
pub const INVALID_COMMAND: u16 = 17;
pub const MALFORMED_COMMAND: u16 = 18;
pub const SUCCESS: u16 = 19;
pub const SUCCESS_NO_CHANGE: u16 = 20;
pub const INTERNAL_ERROR_ALT: u16 = 21;
pub const SESSION_TIMED_OUT: u16 = 22;

/// Codes 2-5, 11 and 21 are the device's "internal error" family, the
/// only ones that say nothing about the request itself.
pub fn is_internal_error(code: u16) -> bool {
    matches!(code, 2..=5 | INTERNAL_ERROR | INTERNAL_ERROR_ALT)
}

/// Short human label for a code, used in error messages.
pub fn describe(code: u16) -> &'static str {
    match code {
        UNKNOWN_COMMAND => "unknown command",
        2..=5 | INTERNAL_ERROR | INTERNAL_ERROR_ALT => "internal error",
        BAD_XPATH => "bad xpath",
        OBJECT_NOT_PRESENT => "object not present",
        OBJECT_NOT_UNIQUE => "object not unique",
        REFERENCE_COUNT_NOT_ZERO => "reference count not zero",
        INVALID_OBJECT => "invalid object",
        OPERATION_NOT_POSSIBLE => "operation not possible",
        OPERATION_DENIED => "operation denied",
        UNAUTHORIZED => "unauthorized",
        INVALID_COMMAND => "invalid command",
        MALFORMED_COMMAND => "malformed command",
        SUCCESS | SUCCESS_NO_CHANGE => "success",
        SESSION_TIMED_OUT => "session timed out",
        _ => "unrecognized code",
    }
}
