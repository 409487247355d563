//! Decomposition of Jam target names into grist, directory, base and suffix.
//!
//! A target name looks like `<grist>some/dir/base.suffix`; every component is
//! optional. The `:G`, `:D`, `:B` and `:S` modifiers all read or replace one
//! component of this decomposition.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParts {
    /// Including the surrounding angle brackets, or empty.
    pub grist: String,
    /// Including the trailing slash, or empty.
    pub directory: String,
    pub base: String,
    /// Including the leading dot, or empty.
    pub suffix: String,
}

impl PathParts {
    pub fn parse(value: &str) -> Self {
        let mut rest = value;
        let mut grist = String::new();
        if rest.starts_with('<') {
            if let Some(end) = rest.find('>') {
                grist = rest[..=end].to_string();
                rest = &rest[end + 1..];
            }
        }

        let (directory, file) = match rest.rfind('/') {
            Some(slash) => (rest[..=slash].to_string(), &rest[slash + 1..]),
            None => (String::new(), rest),
        };

        let (base, suffix) = match file.rfind('.') {
            Some(dot) => (file[..dot].to_string(), file[dot..].to_string()),
            None => (file.to_string(), String::new()),
        };

        Self {
            grist,
            directory,
            base,
            suffix,
        }
    }

    pub fn unparse(&self) -> String {
        let mut out = String::with_capacity(
            self.grist.len() + self.directory.len() + self.base.len() + self.suffix.len(),
        );
        out.push_str(&self.grist);
        out.push_str(&self.directory);
        out.push_str(&self.base);
        out.push_str(&self.suffix);
        out
    }

    /// The directory as `:D` reports it: no trailing slash, except for the
    /// bare root.
    pub fn directory_display(&self) -> &str {
        if self.directory == "/" {
            "/"
        } else {
            self.directory.trim_end_matches('/')
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_decomposition() {
        let parts = PathParts::parse("<gr>some/dir/myfile.cs");
        assert_eq!(parts.grist, "<gr>");
        assert_eq!(parts.directory, "some/dir/");
        assert_eq!(parts.directory_display(), "some/dir");
        assert_eq!(parts.base, "myfile");
        assert_eq!(parts.suffix, ".cs");
        assert_eq!(parts.unparse(), "<gr>some/dir/myfile.cs");
    }

    #[test]
    fn bare_file() {
        let parts = PathParts::parse("file");
        assert_eq!(parts.grist, "");
        assert_eq!(parts.directory, "");
        assert_eq!(parts.base, "file");
        assert_eq!(parts.suffix, "");
    }

    #[test]
    fn last_dot_wins() {
        let parts = PathParts::parse("main.cs.pieter");
        assert_eq!(parts.base, "main.cs");
        assert_eq!(parts.suffix, ".pieter");
    }

    #[test]
    fn rooted_path_keeps_its_slash() {
        let parts = PathParts::parse("/etc/passwd");
        assert_eq!(parts.directory, "/etc/");
        assert_eq!(parts.unparse(), "/etc/passwd");
        assert_eq!(PathParts::parse("/file").directory_display(), "/");
    }

    #[test]
    fn unmatched_angle_bracket_is_not_grist() {
        let parts = PathParts::parse("<open");
        assert_eq!(parts.grist, "");
        assert_eq!(parts.base, "<open");
    }

    #[test]
    fn replace_one_component_round_trips() {
        let mut parts = PathParts::parse("dir/name.old");
        parts.suffix = ".new".to_string();
        assert_eq!(parts.unparse(), "dir/name.new");
    }
}
