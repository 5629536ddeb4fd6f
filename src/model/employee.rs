use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::assignment::PositionAssignment;

/// Gender as stored (`MALE`) and as exchanged with the console (`male`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Employee {
    pub employee_id: String,
    pub full_name: String,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub place_of_birth: Option<String>,
    pub hometown: Option<String>,
    pub nationality: Option<String>,
    pub ethnicity: Option<String>,
    pub religion: Option<String>,
    pub marital_status: Option<String>,
    pub health_status: Option<String>,
    pub avatar_url: Option<String>,
}

impl Employee {
    /// Unknown or missing genders read as `Other`.
    pub fn gender(&self) -> Gender {
        self.gender
            .as_deref()
            .and_then(|g| g.parse().ok())
            .unwrap_or(Gender::Other)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(
    example = json!({
        "employee_id": "6f1c2a8e-0b55-4c1e-9d0e-2f3a4b5c6d7e",
        "full_name": "Nguyễn Văn A",
        "dob": "1995-04-12",
        "gender": "male",
        "place_of_birth": "Hà Nội",
        "hometown": "Nam Định",
        "nationality": "Việt Nam",
        "ethnicity": "Kinh",
        "religion": null,
        "marital_status": "single",
        "health_status": "good",
        "avatar_url": "https://cdn.example.com/a.png",
        "position_assignments": [{
            "employee_id": "6f1c2a8e-0b55-4c1e-9d0e-2f3a4b5c6d7e",
            "department_id": "d-01",
            "department_name": "Phòng Kỹ thuật",
            "position_id": "p-01",
            "position_name": "Trưởng phòng",
            "active": true
        }]
    })
)]
pub struct EmployeeDetail {
    pub employee_id: String,
    pub full_name: String,
    #[schema(value_type = Option<String>, format = "date")]
    pub dob: Option<NaiveDate>,
    pub gender: Gender,
    pub place_of_birth: Option<String>,
    pub hometown: Option<String>,
    pub nationality: Option<String>,
    pub ethnicity: Option<String>,
    pub religion: Option<String>,
    pub marital_status: Option<String>,
    pub health_status: Option<String>,
    pub avatar_url: Option<String>,
    pub position_assignments: Vec<PositionAssignment>,
}

impl EmployeeDetail {
    pub fn new(employee: Employee, position_assignments: Vec<PositionAssignment>) -> Self {
        let gender = employee.gender();
        Self {
            employee_id: employee.employee_id,
            full_name: employee.full_name,
            dob: employee.dob,
            gender,
            place_of_birth: employee.place_of_birth,
            hometown: employee.hometown,
            nationality: employee.nationality,
            ethnicity: employee.ethnicity,
            religion: employee.religion,
            marital_status: employee.marital_status,
            health_status: employee.health_status,
            avatar_url: employee.avatar_url,
            position_assignments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_column_round_trips_through_strum() {
        assert_eq!("FEMALE".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!(Gender::Other.to_string(), "OTHER");
        assert_eq!(Gender::Male.as_ref(), "MALE");
    }

    #[test]
    fn unknown_gender_reads_as_other() {
        let employee = Employee {
            employee_id: "E1".into(),
            full_name: "A".into(),
            dob: None,
            gender: Some("unspecified".into()),
            place_of_birth: None,
            hometown: None,
            nationality: None,
            ethnicity: None,
            religion: None,
            marital_status: None,
            health_status: None,
            avatar_url: None,
        };
        assert_eq!(employee.gender(), Gender::Other);
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), r#""female""#);
    }
}
