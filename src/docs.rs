use crate::api::assignment::SetAssignment;
use crate::api::catalog::{CatalogGroup, Member, NameBody};
use crate::api::dashboard::DashboardResponse;
use crate::api::employee::{CreateEmployee, EmployeeFields, EmployeeWriteReport, UpdateEmployee};
use crate::api::leave_request::{CreateLeave, LeaveListResponse};
use crate::api::timekeeping::TimekeepingEntry;
use crate::auth::handlers::{LoginResponse, SessionInfo};
use crate::model::assignment::PositionAssignment;
use crate::model::department::Department;
use crate::model::employee::{EmployeeDetail, Gender};
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::position::Position;
use crate::model::timekeeping::{EmployeeRef, RawTimeRecord};
use crate::models::{LoginReqDto, RegisterReq};
use crate::service::assignment::ChangeOutcome;
use crate::service::attendance::{
    Classification, EarlyRow, LateRow, MissingPunchRow, MissingSide, PunchStatus,
    RawClassification, RejectedRecord,
};
use crate::service::dashboard::{GenderStats, Kpis};
use crate::service::operation::OperationStatus;
use crate::utils::catalog_cache::Catalog;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Console API",
        version = "1.0.0",
        description = r#"
## HR admin console

Back end for the HR administration console.

### Key Features
- **Dashboard**
  - Early / late / missing-punch lists for a day, with headline numbers
- **Timekeeping**
  - Check-in and check-out, monthly records with punch status, ad-hoc classification
- **Employees**
  - Profiles and their (department, position) assignments
- **Departments & Positions**
  - Catalog maintenance with current members
- **Leave**
  - Requests and HR approval

### Security
Endpoints under `/api` need a **JWT Bearer** access token.
Admin and HR accounts use the console; employee accounts may only check in/out
and submit leave requests.

### Partial failures
Employee writes report every step. `207 Multi-Status` means at least one
step failed; the body says which.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::register,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::dashboard::dashboard,

        crate::api::timekeeping::list_timekeeping,
        crate::api::timekeeping::get_timekeeping,
        crate::api::timekeeping::delete_timekeeping,
        crate::api::timekeeping::check_in,
        crate::api::timekeeping::check_out,
        crate::api::timekeeping::classify,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::department::list_departments,
        crate::api::department::create_department,
        crate::api::department::rename_department,
        crate::api::department::delete_department,

        crate::api::position::list_positions,
        crate::api::position::create_position,
        crate::api::position::rename_position,
        crate::api::position::delete_position,

        crate::api::assignment::get_catalog,
        crate::api::assignment::set_assignment,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave
    ),
    components(
        schemas(
            LoginReqDto,
            RegisterReq,
            LoginResponse,
            SessionInfo,
            DashboardResponse,
            Kpis,
            GenderStats,
            Classification,
            EarlyRow,
            LateRow,
            MissingPunchRow,
            MissingSide,
            PunchStatus,
            RawTimeRecord,
            RawClassification,
            RejectedRecord,
            EmployeeRef,
            TimekeepingEntry,
            EmployeeFields,
            CreateEmployee,
            UpdateEmployee,
            EmployeeDetail,
            EmployeeWriteReport,
            Gender,
            PositionAssignment,
            ChangeOutcome,
            OperationStatus,
            Department,
            Position,
            Catalog,
            CatalogGroup,
            Member,
            NameBody,
            SetAssignment,
            LeaveRequest,
            LeaveStatus,
            CreateLeave,
            LeaveListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, tokens and session"),
        (name = "Dashboard", description = "Daily attendance overview"),
        (name = "Timekeeping", description = "Check-in/out and attendance records"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Department", description = "Department catalog"),
        (name = "Position", description = "Position catalog"),
        (name = "Assignment", description = "Department/position assignments"),
        (name = "Leave", description = "Leave management APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
