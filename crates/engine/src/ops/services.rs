use sea_orm::{QueryOrder, prelude::*, sea_query::OnConflict};

use crate::{EngineError, ResultEngine, Service, services};

use super::{Engine, normalize_required_id};

impl Engine {
    /// All known services ordered by name.
    pub async fn services(&self) -> ResultEngine<Vec<Service>> {
        Ok(services::Entity::find()
            .order_by_asc(services::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Service::from)
            .collect())
    }

    /// Creates a service or renames an existing one.
    pub async fn upsert_service(&self, service_id: &str, name: &str) -> ResultEngine<Service> {
        let service_id = normalize_required_id(service_id, "service")?;
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidId(
                "service name must not be empty".to_string(),
            ));
        }

        let model = services::ActiveModel {
            service_id: sea_orm::ActiveValue::Set(service_id.clone()),
            name: sea_orm::ActiveValue::Set(name.to_string()),
        };
        services::Entity::insert(model)
            .on_conflict(
                OnConflict::column(services::Column::ServiceId)
                    .update_column(services::Column::Name)
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;
        tracing::debug!(%service_id, %name, "service saved");

        Ok(Service {
            id: service_id,
            name: name.to_string(),
        })
    }
}
