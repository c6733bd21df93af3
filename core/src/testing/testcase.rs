use std::path::{Path, PathBuf};

use crate::fsutil;

/// One paired (input script, reference output) unit of grading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    name: String,
    input_path: PathBuf,
    reference_path: PathBuf,
}

pub trait TestcaseFinder {
    fn find_by_input_file_path(&self, path: &Path) -> Option<TestCase>;
}

/// Pairs `<name>.<input_ext>` with a sibling `<name>.<output_ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionPairFinder {
    pub input_ext: String,
    pub output_ext: String,
}

impl ExtensionPairFinder {
    pub fn new(input_ext: impl Into<String>, output_ext: impl Into<String>) -> Self {
        Self {
            input_ext: input_ext.into(),
            output_ext: output_ext.into(),
        }
    }
}

impl TestcaseFinder for ExtensionPairFinder {
    fn find_by_input_file_path(&self, path: &Path) -> Option<TestCase> {
        if path.extension()? != self.input_ext.as_str() {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        let reference = path.with_extension(&self.output_ext);
        if !reference.is_file() {
            log::warn!(
                "Skipping {}: no reference output {}",
                path.to_string_lossy(),
                reference.to_string_lossy()
            );
            return None;
        }
        Some(TestCase::new(name, path, reference))
    }
}

impl TestCase {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<PathBuf>,
        reference: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            input_path: input.into(),
            reference_path: reference.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn reference_path(&self) -> &Path {
        &self.reference_path
    }

    pub fn read_reference(&self) -> fsutil::Result<String> {
        fsutil::read_to_string(&self.reference_path)
    }

    /// Test cases in `dir`, ordered case-insensitively by name.
    pub fn enumerate(
        dir: impl AsRef<Path>,
        finder: &impl TestcaseFinder,
    ) -> fsutil::Result<Vec<Self>> {
        let mut res: Vec<Self> = fsutil::list_files(&dir)?
            .iter()
            .filter_map(|path| finder.find_by_input_file_path(path))
            .collect();
        res.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(res)
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), name).unwrap();
    }

    #[test]
    fn enumerate_pairs_and_sorts_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        for f in [
            "b.scm", "b.output", "A.scm", "A.output", "c.scm", "c.output", "notes.txt",
        ] {
            touch(d, f);
        }

        let finder = ExtensionPairFinder::new("scm", "output");
        let cases = TestCase::enumerate(d, &finder).unwrap();
        let names: Vec<_> = cases.iter().map(TestCase::name).collect();
        assert_eq!(names, ["A", "b", "c"]);
        assert_eq!(cases[1].input_path(), d.join("b.scm"));
        assert_eq!(cases[1].reference_path(), d.join("b.output"));
        assert_eq!(cases[1].read_reference().unwrap(), "b.output");
    }

    #[test]
    fn inputs_without_reference_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "lonely.scm");
        touch(dir.path(), "paired.scm");
        touch(dir.path(), "paired.output");
        touch(dir.path(), "orphan.output");

        let cases =
            TestCase::enumerate(dir.path(), &ExtensionPairFinder::new("scm", "output")).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name(), "paired");
    }

    #[test]
    fn missing_dir_is_an_error() {
        let res = TestCase::enumerate(
            "/nonexistent/tests",
            &ExtensionPairFinder::new("scm", "output"),
        );
        assert!(res.is_err());
    }
}
