//! Authorization targets: read-only snapshots of the resource an action is
//! evaluated against.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tabkeep_core::{ShopId, TabId, UserId};

use crate::actions::{ShopAction, TabAction, UserAction};
use crate::policy::{Policy, Rule};
use crate::principal::User;
use crate::roles::RoleMask;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Shop,
    Tab,
    TabInShop,
    User,
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ResourceKind::Shop => "shop",
            ResourceKind::Tab => "tab",
            ResourceKind::TabInShop => "tab_in_shop",
            ResourceKind::User => "user",
        })
    }
}

/// A resource kind the [`Authorizer`](crate::Authorizer) can judge.
///
/// Implementors expose just the facts rules need: who owns the target, what
/// capabilities a user holds against it, and (for tab targets) the tab.
pub trait Target {
    type Action: Copy + core::fmt::Display;

    const KIND: ResourceKind;

    /// The rule registered for `action` on this kind, if any.
    fn rule(policy: &Policy, action: Self::Action) -> Option<Rule>;

    /// Identity the `Owner` rule compares the subject against.
    fn owner_id(&self) -> UserId;

    /// Capabilities `user` holds through shop membership; `None` when the user
    /// has no relation to the shop (or the target has no shop context).
    fn capabilities_of(&self, user: UserId) -> Option<RoleMask>;

    fn tab(&self) -> Option<&Tab> {
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shop
// ─────────────────────────────────────────────────────────────────────────────

/// A user's association with a shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopMember {
    pub user_id: UserId,
    pub roles: RoleMask,
    /// Invitations start unconfirmed and grant nothing until accepted.
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub owner_id: UserId,
    pub name: String,
    pub members: Vec<ShopMember>,
}

impl Shop {
    /// Capabilities held by `user`: everything for the owner, the stored bits
    /// for a confirmed member, nothing otherwise.
    pub fn capabilities_of(&self, user: UserId) -> Option<RoleMask> {
        if user == self.owner_id {
            return Some(RoleMask::ALL);
        }
        self.members
            .iter()
            .find(|m| m.user_id == user && m.confirmed)
            .map(|m| m.roles)
    }
}

impl Target for Shop {
    type Action = ShopAction;

    const KIND: ResourceKind = ResourceKind::Shop;

    fn rule(policy: &Policy, action: ShopAction) -> Option<Rule> {
        (policy.shop)(action)
    }

    fn owner_id(&self) -> UserId {
        self.owner_id
    }

    fn capabilities_of(&self, user: UserId) -> Option<RoleMask> {
        Shop::capabilities_of(self, user)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tab
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabStatus {
    /// Opened by a customer, waiting for the shop to approve it.
    Pending,
    /// Approved; orders may be placed.
    Active,
    Closed,
}

impl TabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabStatus::Pending => "pending",
            TabStatus::Active => "active",
            TabStatus::Closed => "closed",
        }
    }
}

impl core::fmt::Display for TabStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TabStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TabStatus::Pending),
            "active" => Ok(TabStatus::Active),
            "closed" => Ok(TabStatus::Closed),
            other => Err(format!("unknown tab status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub shop_id: ShopId,
    pub owner_id: UserId,
    pub status: TabStatus,
}

/// A tab judged on its own, without shop context (customer self-service).
impl Target for Tab {
    type Action = TabAction;

    const KIND: ResourceKind = ResourceKind::Tab;

    fn rule(policy: &Policy, action: TabAction) -> Option<Rule> {
        (policy.tab)(action)
    }

    fn owner_id(&self) -> UserId {
        self.owner_id
    }

    fn capabilities_of(&self, _user: UserId) -> Option<RoleMask> {
        None
    }

    fn tab(&self) -> Option<&Tab> {
        Some(self)
    }
}

/// A tab paired with the shop it belongs to, so tab actions can be judged
/// against shop-level roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInShop {
    pub shop: Shop,
    pub tab: Tab,
}

impl TabInShop {
    /// Pair a tab with its shop; `None` when the tab belongs to another shop.
    pub fn new(shop: Shop, tab: Tab) -> Option<Self> {
        (tab.shop_id == shop.id).then_some(Self { shop, tab })
    }
}

impl Target for TabInShop {
    type Action = TabAction;

    const KIND: ResourceKind = ResourceKind::TabInShop;

    fn rule(policy: &Policy, action: TabAction) -> Option<Rule> {
        (policy.tab_in_shop)(action)
    }

    fn owner_id(&self) -> UserId {
        self.shop.owner_id
    }

    fn capabilities_of(&self, user: UserId) -> Option<RoleMask> {
        self.shop.capabilities_of(user)
    }

    fn tab(&self) -> Option<&Tab> {
        Some(&self.tab)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

impl Target for User {
    type Action = UserAction;

    const KIND: ResourceKind = ResourceKind::User;

    fn rule(policy: &Policy, action: UserAction) -> Option<Rule> {
        (policy.user)(action)
    }

    fn owner_id(&self) -> UserId {
        self.id
    }

    fn capabilities_of(&self, _user: UserId) -> Option<RoleMask> {
        None
    }
}
