#![allow(dead_code)]

use std::path::PathBuf;

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn catalog(&self) -> PathBuf {
        self.fixtures_dir.join("catalog.xml")
    }

    pub fn xml_dir(&self) -> PathBuf {
        self.fixtures_dir.join("xml")
    }

    pub fn schemas_dir(&self) -> PathBuf {
        self.fixtures_dir.join("schemas")
    }

    pub fn party_schema(&self) -> PathBuf {
        self.schemas_dir().join("party").join("party.xsd")
    }

    pub fn code_list_transform(&self) -> PathBuf {
        self.fixtures_dir
            .join("schematron")
            .join("codeListValidation.sch.xsl")
    }

    pub fn valid_party(&self) -> PathBuf {
        self.xml_dir().join("ResponsibleParty-valid.xml")
    }

    pub fn schema_invalid_party(&self) -> PathBuf {
        self.xml_dir().join("ResponsibleParty-invalid-schema.xml")
    }

    /// Schema violation on line 6, then a tag mismatch on line 9
    pub fn invalid_then_malformed_party(&self) -> PathBuf {
        self.xml_dir().join("ResponsibleParty-invalid-then-malformed.xml")
    }

    pub fn schematron_invalid_party(&self) -> PathBuf {
        self.xml_dir().join("ResponsibleParty-invalid-schematron.xml")
    }

    pub fn malformed_party(&self) -> PathBuf {
        self.xml_dir().join("ResponsibleParty-malformed.xml")
    }
}

impl Default for TestFixtures {
    fn default() -> Self {
        Self::new()
    }
}
