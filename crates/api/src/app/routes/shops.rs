use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use tabkeep_auth::{Shop, ShopAction, TabAction, TabInShop, TabStatus};
use tabkeep_core::{AccessError, ShopId, TabId};
use tabkeep_events::Notification;
use tabkeep_infra::with_authorized_action;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CurrentSession;

pub fn router() -> Router {
    Router::new()
        .route("/:shop_id", get(get_shop).patch(rename_shop).delete(delete_shop))
        .route("/:shop_id/tabs/:tab_id/approve", post(approve_tab))
        .route("/:shop_id/tabs/:tab_id/close", post(close_tab))
}

fn parse_id<T: std::str::FromStr>(raw: &str) -> Result<T, Response>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

pub async fn get_shop(
    Extension(services): Extension<Arc<AppServices>>,
    session: CurrentSession,
    Path(shop_id): Path<String>,
) -> Response {
    let shop_id: ShopId = match parse_id(&shop_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let result = with_authorized_action::<Shop, _, _>(
        services.store.as_ref(),
        services.authorizer,
        session.data(),
        shop_id,
        ShopAction::Read,
        |_tx, _user, shop| Box::pin(async move { Ok::<_, AccessError>(shop) }),
    )
    .await;

    match result {
        Ok(shop) => Json(dto::ShopResponse::from(shop)).into_response(),
        Err(e) => errors::access_error_to_response(e),
    }
}

pub async fn rename_shop(
    Extension(services): Extension<Arc<AppServices>>,
    session: CurrentSession,
    Path(shop_id): Path<String>,
    Json(body): Json<dto::RenameShopRequest>,
) -> Response {
    let shop_id: ShopId = match parse_id(&shop_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "name must not be empty",
        );
    }

    let result = with_authorized_action::<Shop, _, _>(
        services.store.as_ref(),
        services.authorizer,
        session.data(),
        shop_id,
        ShopAction::Update,
        move |tx, user, mut shop| {
            Box::pin(async move {
                tx.rename_shop(shop.id, &name).await?;
                shop.name = name;
                Ok::<_, AccessError>((user.id, shop))
            })
        },
    )
    .await;

    match result {
        Ok((actor, shop)) => {
            services.publish(Notification::new(
                shop.id,
                "shop.updated",
                actor,
                json!({ "name": shop.name }),
            ));
            Json(dto::ShopResponse::from(shop)).into_response()
        }
        Err(e) => errors::access_error_to_response(e),
    }
}

pub async fn delete_shop(
    Extension(services): Extension<Arc<AppServices>>,
    session: CurrentSession,
    Path(shop_id): Path<String>,
) -> Response {
    let shop_id: ShopId = match parse_id(&shop_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let result = with_authorized_action::<Shop, _, _>(
        services.store.as_ref(),
        services.authorizer,
        session.data(),
        shop_id,
        ShopAction::Delete,
        |tx, user, shop| {
            Box::pin(async move {
                tx.delete_shop(shop.id).await?;
                Ok::<_, AccessError>(user.id)
            })
        },
    )
    .await;

    match result {
        Ok(actor) => {
            services.publish(Notification::new(shop_id, "shop.deleted", actor, json!({})));
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::access_error_to_response(e),
    }
}

pub async fn approve_tab(
    Extension(services): Extension<Arc<AppServices>>,
    session: CurrentSession,
    Path((shop_id, tab_id)): Path<(String, String)>,
) -> Response {
    transition_tab(&services, &session, &shop_id, &tab_id, TabAction::Approve).await
}

pub async fn close_tab(
    Extension(services): Extension<Arc<AppServices>>,
    session: CurrentSession,
    Path((shop_id, tab_id)): Path<(String, String)>,
) -> Response {
    transition_tab(&services, &session, &shop_id, &tab_id, TabAction::Close).await
}

/// Approve moves a pending tab to active; close moves any tab to closed.
/// A tab already in the requested state (or an approve on a non-pending tab)
/// is returned unchanged and nothing is published.
async fn transition_tab(
    services: &AppServices,
    session: &CurrentSession,
    shop_id: &str,
    tab_id: &str,
    action: TabAction,
) -> Response {
    let ids = parse_id::<ShopId>(shop_id).and_then(|s| parse_id::<TabId>(tab_id).map(|t| (s, t)));
    let (shop_id, tab_id) = match ids {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };

    let (target_status, topic) = match action {
        TabAction::Approve => (TabStatus::Active, "tab.approved"),
        _ => (TabStatus::Closed, "tab.closed"),
    };

    let result = with_authorized_action::<TabInShop, _, _>(
        services.store.as_ref(),
        services.authorizer,
        session.data(),
        (shop_id, tab_id),
        action,
        move |tx, user, target| {
            Box::pin(async move {
                let mut tab = target.tab;
                let applies = match target_status {
                    TabStatus::Active => tab.status == TabStatus::Pending,
                    _ => tab.status != target_status,
                };
                if applies {
                    tx.set_tab_status(tab.id, target_status).await?;
                    tab.status = target_status;
                }
                Ok::<_, AccessError>((user.id, tab, applies))
            })
        },
    )
    .await;

    match result {
        Ok((actor, tab, changed)) => {
            if changed {
                services.publish(Notification::new(
                    shop_id,
                    topic,
                    actor,
                    json!({ "tab_id": tab.id.to_string(), "status": tab.status }),
                ));
            }
            Json(dto::TabResponse::from(tab)).into_response()
        }
        Err(e) => errors::access_error_to_response(e),
    }
}
