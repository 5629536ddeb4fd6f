use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Department {
    #[schema(example = "d-01")]
    pub department_id: String,
    #[schema(example = "Phòng Kỹ thuật")]
    pub department_name: String,
}
