/// Lexically normalize a slash-separated path without touching the filesystem.
///
/// `.` segments are dropped and `..` collapses against the preceding normal
/// segment. Under the root a `..` is discarded; at the start of a relative
/// path it is kept. An empty relative result becomes `.`.
pub fn normalize_lexical(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            normal => segments.push(normal),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_parent_segments() {
        assert_eq!(normalize_lexical("/tmp/work/../../etc/passwd"), "/etc/passwd");
        assert_eq!(normalize_lexical("./a/../b"), "b");
    }

    #[test]
    fn parent_of_root_is_root() {
        assert_eq!(normalize_lexical("/../../etc"), "/etc");
        assert_eq!(normalize_lexical("/.."), "/");
    }

    #[test]
    fn leading_relative_parents_are_preserved() {
        assert_eq!(normalize_lexical("../../etc/passwd"), "../../etc/passwd");
        assert_eq!(normalize_lexical("./.."), "..");
        assert_eq!(normalize_lexical("./a/.."), ".");
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in ["/a/b/../c", "../x/../../y", "./a/./b/..", "/x/.."] {
            let once = normalize_lexical(input);
            assert_eq!(normalize_lexical(&once), once, "input: {input}");
        }
    }
}
