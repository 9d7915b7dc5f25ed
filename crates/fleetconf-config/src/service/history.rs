//! History paging and diff

use sea_orm::*;

use fleetconf_common::{FleetconfError, Result};
use fleetconf_persistence::entity::{configuration, configuration_history};

use crate::model::{ConfigurationDetail, DiffResult, HistoryItem, HistoryPage, Pagination};

/// Row offset of a page; fails when the page lies beyond any addressable row
fn page_offset(page: u64, size: u64) -> Result<u64> {
    page.checked_mul(size)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| {
            FleetconfError::IllegalArgument(format!(
                "page {} of size {} is out of range",
                page, size
            ))
        })
}

/// One page of a configuration's history, newest first. Pages start at 0;
/// a page size of 0 is treated as 1.
pub async fn history_page(
    db: &DatabaseConnection,
    config_id: i32,
    page: u64,
    size: u64,
) -> Result<HistoryPage> {
    let size = size.max(1);
    let offset = page_offset(page, size)?;
    let query = configuration_history::Entity::find()
        .filter(configuration_history::Column::ConfigurationId.eq(config_id));

    let (list, total) = tokio::try_join!(
        query
            .clone()
            .order_by_desc(configuration_history::Column::Id)
            .limit(size)
            .offset(offset)
            .all(db),
        query.count(db)
    )?;

    Ok(HistoryPage {
        list: list.into_iter().map(HistoryItem::from).collect(),
        pagination: Pagination {
            current: page,
            page_size: size,
            total,
        },
    })
}

/// A history entry next to its predecessor in the same configuration
pub async fn diff(db: &DatabaseConnection, config_id: i32, history_id: i32) -> Result<DiffResult> {
    let modified = configuration_history::Entity::find_by_id(history_id)
        .one(db)
        .await?
        .ok_or_else(|| FleetconfError::not_found(format!("history {}", history_id)))?;

    let modified_config = configuration::Entity::find_by_id(modified.configuration_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            FleetconfError::not_found(format!("configuration {}", modified.configuration_id))
        })?;

    let origin = configuration_history::Entity::find()
        .filter(configuration_history::Column::Id.lt(history_id))
        .filter(configuration_history::Column::ConfigurationId.eq(config_id))
        .order_by_desc(configuration_history::Column::Id)
        .one(db)
        .await?;

    let origin = match origin {
        None => None,
        Some(history) if history.configuration_id == modified_config.id => {
            Some(ConfigurationDetail::from_history(history, &modified_config))
        }
        Some(history) => configuration::Entity::find_by_id(history.configuration_id)
            .one(db)
            .await?
            .map(|config| ConfigurationDetail::from_history(history, &config)),
    };

    Ok(DiffResult {
        origin,
        modified: ConfigurationDetail::from_history(modified, &modified_config),
    })
}
