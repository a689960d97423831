use nanoid::nanoid;

/// Length of generated passwords unless configured otherwise.
pub const DEFAULT_PASSWORD_LENGTH: usize = 15;

/// Characters a generated password is drawn from.
pub const PASSWORD_POOL: &[char; 66] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L',
    'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '1', '2', '3', '4', '5',
    '6', '7', '8', '9', '0', '_', '-', '=', '.',
];

/// Generates a password of exactly `len` characters from [`PASSWORD_POOL`].
///
/// Each character is drawn independently and uniformly from the OS-seeded generator.
#[must_use]
pub fn generate_password(len: usize) -> String {
    if len == 0 {
        return String::new();
    }
    nanoid!(len, PASSWORD_POOL)
}
