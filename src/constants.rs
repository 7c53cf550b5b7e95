pub mod limits {

    pub const RESET_TOKEN_BYTES: usize = 32;

    pub const MIN_PASSWORD_LEN: usize = 8;

    pub const MIN_SECURITY_QUESTIONS: usize = 1;

    pub const MAX_SECURITY_QUESTIONS: usize = 3;
}
