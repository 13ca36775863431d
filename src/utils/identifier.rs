//! System-name generation.
//!
//! Every prepared model gets a fresh system name so that repeated runs
//! against the same template never collide inside the engine.

use rand::Rng;

/// Prefix substituted for a leading digit, which the DSL does not allow
const DIGIT_FIXUP: char = 's';

/// Length of a generated name in hex characters
const NAME_LENGTH: usize = 32;

/// Generate a random system name of 32 lowercase hex characters.
///
/// If the first character comes out as a digit it is replaced by `s`, so the
/// result is always a valid DSL identifier.
///
/// # Examples
/// ```
/// use popsim::utils::identifier::generate_system_name;
/// use popsim::utils::validation::validate_dsl_identifier;
///
/// let name = generate_system_name();
/// assert_eq!(name.len(), 32);
/// assert!(validate_dsl_identifier(&name).is_ok());
/// ```
pub fn generate_system_name() -> String {
    let mut rng = rand::thread_rng();
    let hex: String = (0..NAME_LENGTH)
        .map(|_| {
            let digit = rng.gen_range(0..16u32);
            std::char::from_digit(digit, 16).unwrap_or('0')
        })
        .collect();

    fix_leading_digit(hex)
}

/// Replace a leading ASCII digit with the fix-up prefix
fn fix_leading_digit(name: String) -> String {
    match name.chars().next() {
        Some(first) if first.is_ascii_digit() => {
            let mut fixed = String::with_capacity(name.len());
            fixed.push(DIGIT_FIXUP);
            fixed.push_str(&name[first.len_utf8()..]);
            fixed
        }
        _ => name,
    }
}
