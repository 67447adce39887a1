//! Field names as formula identifiers.

/// Replace every maximal run of whitespace with a single underscore.
///
/// Nothing else changes, case included. `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(name: &str) -> String {
    let mut identifier = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for character in name.chars() {
        if character.is_whitespace() {
            if !in_whitespace {
                identifier.push('_');
            }
            in_whitespace = true;
        } else {
            identifier.push(character);
            in_whitespace = false;
        }
    }
    identifier
}
