//! Authorize-then-mutate inside one transaction.
//!
//! The subject and the target are both loaded fresh in the transaction that
//! will perform the mutation, so a role revoked or a tab closed before the
//! check cannot be acted on afterwards.

use std::fmt::Debug;

use async_trait::async_trait;
use tracing::{error, info};

use tabkeep_auth::{Authorizer, AuthzError, Shop, Tab, TabInShop, Target, User};
use tabkeep_core::{AccessError, ShopId, TabId, UserId};

use crate::session::SessionData;
use crate::store::{Store, StoreError, TxFuture, TxHandle, with_tx};

/// A target kind that can be loaded inside a transaction.
#[async_trait]
pub trait Resolve: Target + Sized + Send {
    type Id: Copy + Send + Debug + 'static;

    async fn resolve(tx: &mut TxHandle, id: Self::Id) -> Result<Self, StoreError>;
}

#[async_trait]
impl Resolve for Shop {
    type Id = ShopId;

    async fn resolve(tx: &mut TxHandle, id: ShopId) -> Result<Self, StoreError> {
        tx.get_shop(id).await
    }
}

#[async_trait]
impl Resolve for Tab {
    type Id = TabId;

    async fn resolve(tx: &mut TxHandle, id: TabId) -> Result<Self, StoreError> {
        tx.get_tab(id).await
    }
}

#[async_trait]
impl Resolve for TabInShop {
    type Id = (ShopId, TabId);

    /// A tab addressed through a shop it does not belong to does not exist.
    async fn resolve(
        tx: &mut TxHandle,
        (shop_id, tab_id): (ShopId, TabId),
    ) -> Result<Self, StoreError> {
        let shop = tx.get_shop(shop_id).await?;
        let tab = tx.get_tab(tab_id).await?;
        TabInShop::new(shop, tab).ok_or(StoreError::NotFound("tab"))
    }
}

#[async_trait]
impl Resolve for User {
    type Id = UserId;

    async fn resolve(tx: &mut TxHandle, id: UserId) -> Result<Self, StoreError> {
        tx.get_user(id).await
    }
}

/// Load the session's user and the target, authorize `action`, then run
/// `work` in the same transaction.
///
/// Anonymous sessions, denials and unregistered actions all fail with
/// `Unauthorized` and roll the transaction back without running `work`.
pub async fn with_authorized_action<T, R, F>(
    store: &dyn Store,
    authorizer: Authorizer,
    session: &SessionData,
    target_id: T::Id,
    action: T::Action,
    work: F,
) -> Result<R, AccessError>
where
    T: Resolve + 'static,
    T::Action: Send + 'static,
    R: Send + 'static,
    F: for<'t> FnOnce(&'t mut TxHandle, User, T) -> TxFuture<'t, R> + Send + 'static,
{
    let Some(user_id) = session.user_id else {
        info!(kind = %T::KIND, action = %action, "anonymous session cannot act");
        return Err(AccessError::Unauthorized);
    };

    with_tx(store, move |tx| {
        Box::pin(async move {
            let subject = tx.get_user(user_id).await?;
            let target = T::resolve(tx, target_id).await?;

            match authorizer.authorize(&subject, &target, action) {
                Ok(true) => {}
                Ok(false) => {
                    info!(
                        subject = %subject.id,
                        kind = %T::KIND,
                        action = %action,
                        target = ?target_id,
                        "authorization denied"
                    );
                    return Err(AccessError::Unauthorized);
                }
                Err(AuthzError::UnknownAction { kind, action }) => {
                    error!(%kind, %action, "action not registered for resource kind");
                    return Err(AccessError::Unauthorized);
                }
            }

            work(tx, subject, target).await
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use tabkeep_auth::{RoleMask, ShopAction, ShopMember, TabAction, TabStatus, UserAction};

    use super::*;
    use crate::store::InMemoryStore;

    struct Fixture {
        store: InMemoryStore,
        owner: UserId,
        member: UserId,
        shop: ShopId,
        tab: TabId,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let owner = UserId::new();
        let member = UserId::new();
        store.insert_user(User::new(owner, "owner@example.com", "Owner")).await;
        store.insert_user(User::new(member, "staff@example.com", "Staff")).await;

        let shop = Shop {
            id: ShopId::new(),
            owner_id: owner,
            name: "Corner Cafe".to_string(),
            members: vec![ShopMember {
                user_id: member,
                roles: RoleMask::MANAGE_ITEMS,
                confirmed: true,
            }],
        };
        let tab = Tab {
            id: TabId::new(),
            shop_id: shop.id,
            owner_id: member,
            status: TabStatus::Pending,
        };
        let (shop_id, tab_id) = (shop.id, tab.id);
        store.insert_shop(shop).await;
        store.insert_tab(tab).await;

        Fixture {
            store,
            owner,
            member,
            shop: shop_id,
            tab: tab_id,
        }
    }

    fn session(user: Option<UserId>) -> SessionData {
        SessionData {
            user_id: user,
            csrf_token: "t".to_string(),
            origin_ip: IpAddr::from([127, 0, 0, 1]),
        }
    }

    fn rename(tx: &mut TxHandle, _user: User, shop: Shop) -> TxFuture<'_, ()> {
        Box::pin(async move {
            tx.rename_shop(shop.id, "Renamed").await?;
            Ok::<_, AccessError>(())
        })
    }

    #[tokio::test]
    async fn owner_mutation_commits() {
        let f = fixture().await;
        with_authorized_action::<Shop, _, _>(
            &f.store,
            Authorizer::default(),
            &session(Some(f.owner)),
            f.shop,
            ShopAction::Update,
            rename,
        )
        .await
        .unwrap();

        assert_eq!(f.store.shop(f.shop).await.unwrap().name, "Renamed");
    }

    #[tokio::test]
    async fn denied_subject_never_reaches_work() {
        let f = fixture().await;
        let err = with_authorized_action::<Shop, _, _>(
            &f.store,
            Authorizer::default(),
            &session(Some(f.member)),
            f.shop,
            ShopAction::Update,
            rename,
        )
        .await
        .unwrap_err();

        assert_eq!(err, AccessError::Unauthorized);
        assert_eq!(f.store.shop(f.shop).await.unwrap().name, "Corner Cafe");
    }

    #[tokio::test]
    async fn work_failure_rolls_back() {
        let f = fixture().await;
        let err = with_authorized_action::<Shop, (), _>(
            &f.store,
            Authorizer::default(),
            &session(Some(f.owner)),
            f.shop,
            ShopAction::Update,
            |tx, _user, shop| {
                Box::pin(async move {
                    tx.rename_shop(shop.id, "Half Done").await?;
                    Err::<(), _>(AccessError::internal("downstream failed"))
                })
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AccessError::Internal(_)));
        assert_eq!(f.store.shop(f.shop).await.unwrap().name, "Corner Cafe");
    }

    #[tokio::test]
    async fn anonymous_session_is_unauthorized() {
        let f = fixture().await;
        let err = with_authorized_action::<Shop, _, _>(
            &f.store,
            Authorizer::default(),
            &session(None),
            f.shop,
            ShopAction::Read,
            rename,
        )
        .await
        .unwrap_err();
        assert_eq!(err, AccessError::Unauthorized);
    }

    #[tokio::test]
    async fn session_for_deleted_user_is_not_found() {
        let f = fixture().await;
        let err = with_authorized_action::<Shop, _, _>(
            &f.store,
            Authorizer::default(),
            &session(Some(UserId::new())),
            f.shop,
            ShopAction::Read,
            rename,
        )
        .await
        .unwrap_err();
        assert_eq!(err, AccessError::NotFound("user"));
    }

    #[tokio::test]
    async fn missing_target_is_not_found() {
        let f = fixture().await;
        let err = with_authorized_action::<Shop, _, _>(
            &f.store,
            Authorizer::default(),
            &session(Some(f.owner)),
            ShopId::new(),
            ShopAction::Read,
            rename,
        )
        .await
        .unwrap_err();
        assert_eq!(err, AccessError::NotFound("shop"));
    }

    #[tokio::test]
    async fn unregistered_action_is_reported_as_unauthorized() {
        let f = fixture().await;
        let err = with_authorized_action::<Tab, (), _>(
            &f.store,
            Authorizer::default(),
            &session(Some(f.member)),
            f.tab,
            TabAction::Approve,
            |_tx, _user, _tab| Box::pin(async move { Ok::<_, AccessError>(()) }),
        )
        .await
        .unwrap_err();
        assert_eq!(err, AccessError::Unauthorized);
    }

    #[tokio::test]
    async fn tab_in_foreign_shop_is_not_found() {
        let f = fixture().await;
        let other_shop = Shop {
            id: ShopId::new(),
            owner_id: f.owner,
            name: "Elsewhere".to_string(),
            members: vec![],
        };
        let other_id = other_shop.id;
        f.store.insert_shop(other_shop).await;

        let err = with_authorized_action::<TabInShop, (), _>(
            &f.store,
            Authorizer::default(),
            &session(Some(f.owner)),
            (other_id, f.tab),
            TabAction::Approve,
            |_tx, _user, _target| Box::pin(async move { Ok::<_, AccessError>(()) }),
        )
        .await
        .unwrap_err();
        assert_eq!(err, AccessError::NotFound("tab"));
    }

    #[tokio::test]
    async fn owner_approves_tab_through_shop() {
        let f = fixture().await;
        let status = with_authorized_action::<TabInShop, _, _>(
            &f.store,
            Authorizer::default(),
            &session(Some(f.owner)),
            (f.shop, f.tab),
            TabAction::Approve,
            |tx, _user, target| {
                Box::pin(async move {
                    tx.set_tab_status(target.tab.id, TabStatus::Active).await?;
                    Ok::<_, AccessError>(TabStatus::Active)
                })
            },
        )
        .await
        .unwrap();

        assert_eq!(status, TabStatus::Active);
        assert_eq!(f.store.tab(f.tab).await.unwrap().status, TabStatus::Active);
    }

    #[tokio::test]
    async fn users_manage_only_themselves() {
        let f = fixture().await;
        let read_self = with_authorized_action::<User, _, _>(
            &f.store,
            Authorizer::default(),
            &session(Some(f.member)),
            f.member,
            UserAction::Read,
            |_tx, _user, target| Box::pin(async move { Ok::<_, AccessError>(target.email) }),
        )
        .await
        .unwrap();
        assert_eq!(read_self, "staff@example.com");

        let err = with_authorized_action::<User, (), _>(
            &f.store,
            Authorizer::default(),
            &session(Some(f.member)),
            f.owner,
            UserAction::Read,
            |_tx, _user, _target| Box::pin(async move { Ok::<_, AccessError>(()) }),
        )
        .await
        .unwrap_err();
        assert_eq!(err, AccessError::Unauthorized);
    }
}
