use serde::{Deserialize, Serialize};

pub const OBJECT_TYPE_TESTCASE: &str = "Testcase";
pub const OBJECT_STATUS_RELEASED: &str = "Released";

/// A released testcase object exported from a DOORS module.
///
/// Field names serialise exactly as DOORS attribute names so clients see
/// `ID`, `TcURL`, `Test_Steps` and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testcase {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Object_Type")]
    pub object_type: String,
    #[serde(rename = "Object_Status")]
    pub object_status: String,
    #[serde(rename = "TcURL")]
    pub tc_url: String,
    #[serde(rename = "Test_Description")]
    pub test_description: String,
    #[serde(rename = "Test_Steps")]
    pub test_steps: String,
    #[serde(rename = "Expected_Results")]
    pub expected_results: String,
}

impl Testcase {
    pub fn new(
        id: impl Into<String>,
        tc_url: impl Into<String>,
        test_description: impl Into<String>,
        test_steps: impl Into<String>,
        expected_results: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            object_type: OBJECT_TYPE_TESTCASE.to_string(),
            object_status: OBJECT_STATUS_RELEASED.to_string(),
            tc_url: tc_url.into(),
            test_description: test_description.into(),
            test_steps: test_steps.into(),
            expected_results: expected_results.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_doors_attribute_names() {
        let tc = Testcase::new("TC-1", "doors://host/1", "desc", "step", "result");
        let value = serde_json::to_value(&tc).unwrap();
        assert_eq!(
            value,
            json!({
                "ID": "TC-1",
                "Object_Type": "Testcase",
                "Object_Status": "Released",
                "TcURL": "doors://host/1",
                "Test_Description": "desc",
                "Test_Steps": "step",
                "Expected_Results": "result"
            })
        );
    }
}
