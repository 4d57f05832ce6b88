//! Random secrets for `autogenerated` variables.

use base64::{Engine, engine::general_purpose::STANDARD};
use rand::Rng;
use rand::distributions::Alphanumeric;

use super::variable::Autogenerate;

/// Produce a fresh secret.
///
/// Alphanumeric mode draws `length` characters. Base64 mode draws `length` random
/// bytes and encodes them, so the text is longer than `length`.
pub fn generate_secret(settings: &Autogenerate) -> String {
    let mut rng = rand::thread_rng();
    if settings.base64 {
        let mut bytes = vec![0u8; settings.length];
        rng.fill(bytes.as_mut_slice());
        STANDARD.encode(bytes)
    } else {
        (&mut rng).sample_iter(&Alphanumeric).take(settings.length).map(char::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphanumeric_length() {
        let secret = generate_secret(&Autogenerate::default());
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_base64_decodes_to_requested_bytes() {
        let secret = generate_secret(&Autogenerate {
            length: 24,
            base64: true,
        });
        assert_eq!(STANDARD.decode(secret).unwrap().len(), 24);
    }

    #[test]
    fn test_secrets_differ() {
        let settings = Autogenerate::default();
        assert_ne!(generate_secret(&settings), generate_secret(&settings));
    }
}
