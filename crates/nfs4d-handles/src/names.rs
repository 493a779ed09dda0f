/// Maximum length of a single path component the wire format will accept
/// before the compound engine maps it to `NAMETOOLONG`.
pub const MAX_NAME_LEN: usize = 255;

/// Validate a single path component (the `name` argument of LOOKUP,
/// CREATE, REMOVE, RENAME, SYMLINK). Rejects empty names, `.`/`..`, an
/// embedded `/`, and names over [`MAX_NAME_LEN`] bytes.
pub fn validate_component(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }
    if name == "." || name == ".." {
        return false;
    }
    !name.contains('/') && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dot_and_dotdot() {
        assert!(!validate_component("."));
        assert!(!validate_component(".."));
    }

    #[test]
    fn rejects_embedded_slash() {
        assert!(!validate_component("a/b"));
    }

    #[test]
    fn rejects_overlong() {
        let long = "a".repeat(MAX_NAME_LEN + 1);
        assert!(!validate_component(&long));
    }

    #[test]
    fn accepts_ordinary_name() {
        assert!(validate_component("readme.txt"));
    }
}
