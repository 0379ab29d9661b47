//! Token registry: token records and the identity-to-token ownership mapping.
//!
//! Tokens are created only through [`TokenRegistry::issue`], change hands only
//! through [`TokenRegistry::transfer`], advance only `Active → CheckedIn`, and
//! are never deleted.

use crate::error::{LedgerError, LedgerResult};
use crate::event::LedgerEvent;
use crate::types::{EventId, Identity, Token, TokenDetails, TokenId, TokenState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Owns every token record and its current holder
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenRegistry {
    tokens: BTreeMap<TokenId, Token>,
    owners: BTreeMap<TokenId, Identity>,
    holdings: HashMap<Identity, BTreeSet<TokenId>>,
    next_id: u64,
}

impl TokenRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `Active` token owned by `owner`
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] if `owner` is the null identity.
    pub fn issue(
        &mut self,
        owner: &Identity,
        event_id: EventId,
        issued_at: DateTime<Utc>,
        emitted: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<TokenId> {
        if owner.is_null() {
            return Err(LedgerError::InvalidArgument(
                "tokens cannot be issued to the null identity".to_string(),
            ));
        }

        let token_id = TokenId::new(self.next_id);
        self.next_id += 1;

        self.tokens.insert(
            token_id,
            Token {
                id: token_id,
                event_id,
                state: TokenState::Active,
                issued_at,
            },
        );
        self.assign(token_id, owner.clone());

        emitted.push(LedgerEvent::TokenIssued {
            token_id,
            event_id,
            owner: owner.clone(),
            issued_at,
        });
        Ok(token_id)
    }

    /// Marks an `Active` token as used for entry
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if the token does not exist
    /// - [`LedgerError::InvalidState`] if the token is not `Active`
    pub fn check_in(&mut self, token_id: TokenId, emitted: &mut Vec<LedgerEvent>) -> LedgerResult<()> {
        let token = self
            .tokens
            .get_mut(&token_id)
            .ok_or_else(|| LedgerError::NotFound(format!("{token_id} does not exist")))?;

        if token.state != TokenState::Active {
            return Err(LedgerError::InvalidState(format!(
                "{token_id} is {} and cannot be checked in",
                token.state
            )));
        }

        token.state = TokenState::CheckedIn;
        emitted.push(LedgerEvent::TokenCheckedIn {
            token_id,
            event_id: token.event_id,
        });
        Ok(())
    }

    /// Moves a token from its current owner to `to`. Tokens in any state move.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] unless `from` owns the token and is the
    ///   caller; a token that does not exist has no owner
    /// - [`LedgerError::InvalidArgument`] if `to` is the null identity
    pub fn transfer(
        &mut self,
        caller: &Identity,
        token_id: TokenId,
        from: &Identity,
        to: &Identity,
        emitted: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<()> {
        let event_id = match (self.tokens.get(&token_id), self.owners.get(&token_id)) {
            (Some(token), Some(owner)) if owner == from && from == caller => token.event_id,
            _ => {
                return Err(LedgerError::Unauthorized(format!(
                    "{caller} cannot transfer {token_id} on behalf of {from}"
                )));
            },
        };
        if to.is_null() {
            return Err(LedgerError::InvalidArgument(
                "tokens cannot be transferred to the null identity".to_string(),
            ));
        }

        self.release(token_id, from);
        self.assign(token_id, to.clone());

        emitted.push(LedgerEvent::TokenTransferred {
            token_id,
            event_id,
            from: from.clone(),
            to: to.clone(),
        });
        Ok(())
    }

    /// Admission check: `holder` owns an `Active` token of `event_id`.
    ///
    /// Never fails; unknown tokens verify as false.
    #[must_use]
    pub fn verify(&self, token_id: TokenId, event_id: EventId, holder: &Identity) -> bool {
        let Some(token) = self.tokens.get(&token_id) else {
            return false;
        };
        token.event_id == event_id
            && token.state == TokenState::Active
            && self.owners.get(&token_id) == Some(holder)
    }

    /// Returns a token with its current holder
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if the token does not exist.
    pub fn get(&self, token_id: TokenId) -> LedgerResult<TokenDetails> {
        let token = self
            .tokens
            .get(&token_id)
            .ok_or_else(|| LedgerError::NotFound(format!("{token_id} does not exist")))?;
        let owner = self
            .owners
            .get(&token_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("{token_id} has no owner")))?;

        Ok(TokenDetails {
            id: token.id,
            event_id: token.event_id,
            state: token.state,
            issued_at: token.issued_at,
            owner,
        })
    }

    /// Returns the current holder of a token
    #[must_use]
    pub fn owner_of(&self, token_id: TokenId) -> Option<&Identity> {
        self.owners.get(&token_id)
    }

    /// Returns the tokens held by `owner`, ascending
    #[must_use]
    pub fn tokens_of(&self, owner: &Identity) -> Vec<TokenId> {
        self.holdings
            .get(owner)
            .map(|held| held.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of tokens ever issued
    #[must_use]
    pub const fn total_issued(&self) -> u64 {
        self.next_id
    }

    fn assign(&mut self, token_id: TokenId, owner: Identity) {
        self.holdings
            .entry(owner.clone())
            .or_default()
            .insert(token_id);
        self.owners.insert(token_id, owner);
    }

    fn release(&mut self, token_id: TokenId, owner: &Identity) {
        if let Some(held) = self.holdings.get_mut(owner) {
            held.remove(&token_id);
            if held.is_empty() {
                self.holdings.remove(owner);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn alice() -> Identity {
        Identity::new("alice")
    }

    fn bob() -> Identity {
        Identity::new("bob")
    }

    #[test]
    fn issue_assigns_sequential_ids() {
        let mut registry = TokenRegistry::new();
        let mut events = Vec::new();

        let first = registry.issue(&alice(), EventId::new(1), at(), &mut events).unwrap();
        let second = registry.issue(&bob(), EventId::new(1), at(), &mut events).unwrap();

        assert_eq!(first, TokenId::new(0));
        assert_eq!(second, TokenId::new(1));
        assert_eq!(registry.total_issued(), 2);
        assert_eq!(events.len(), 2);
        assert_eq!(registry.get(first).unwrap().owner, alice());
        assert_eq!(registry.get(first).unwrap().state, TokenState::Active);
    }

    #[test]
    fn issue_to_null_rejected_without_consuming_an_id() {
        let mut registry = TokenRegistry::new();
        let mut events = Vec::new();

        let result = registry.issue(&Identity::null(), EventId::new(1), at(), &mut events);
        assert!(matches!(result, Err(LedgerError::InvalidArgument(_))));
        assert_eq!(registry.total_issued(), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn check_in_only_from_active() {
        let mut registry = TokenRegistry::new();
        let mut events = Vec::new();
        let id = registry.issue(&alice(), EventId::new(1), at(), &mut events).unwrap();

        registry.check_in(id, &mut events).unwrap();
        assert_eq!(registry.get(id).unwrap().state, TokenState::CheckedIn);

        assert!(matches!(
            registry.check_in(id, &mut events),
            Err(LedgerError::InvalidState(_))
        ));
        assert!(matches!(
            registry.check_in(TokenId::new(99), &mut events),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn transfer_moves_ownership_and_verification() {
        let mut registry = TokenRegistry::new();
        let mut events = Vec::new();
        let event_id = EventId::new(1);
        let id = registry.issue(&alice(), event_id, at(), &mut events).unwrap();

        registry
            .transfer(&alice(), id, &alice(), &bob(), &mut events)
            .unwrap();

        assert!(registry.verify(id, event_id, &bob()));
        assert!(!registry.verify(id, event_id, &alice()));
        assert_eq!(registry.tokens_of(&bob()), vec![id]);
        assert!(registry.tokens_of(&alice()).is_empty());
    }

    #[test]
    fn transfer_requires_owner_as_caller() {
        let mut registry = TokenRegistry::new();
        let mut events = Vec::new();
        let id = registry.issue(&alice(), EventId::new(1), at(), &mut events).unwrap();

        // bob claims to send alice's token
        assert!(matches!(
            registry.transfer(&bob(), id, &alice(), &bob(), &mut events),
            Err(LedgerError::Unauthorized(_))
        ));
        // bob is not the owner
        assert!(matches!(
            registry.transfer(&bob(), id, &bob(), &alice(), &mut events),
            Err(LedgerError::Unauthorized(_))
        ));
        assert!(matches!(
            registry.transfer(&alice(), id, &alice(), &Identity::null(), &mut events),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(registry.owner_of(id), Some(&alice()));
    }

    #[test]
    fn unknown_token_has_no_owner_to_transfer_from() {
        let mut registry = TokenRegistry::new();
        let mut events = Vec::new();

        assert!(matches!(
            registry.transfer(&alice(), TokenId::new(7), &alice(), &bob(), &mut events),
            Err(LedgerError::Unauthorized(_))
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn checked_in_tokens_remain_transferable_but_do_not_verify() {
        let mut registry = TokenRegistry::new();
        let mut events = Vec::new();
        let event_id = EventId::new(3);
        let id = registry.issue(&alice(), event_id, at(), &mut events).unwrap();
        registry.check_in(id, &mut events).unwrap();

        registry
            .transfer(&alice(), id, &alice(), &bob(), &mut events)
            .unwrap();
        assert!(!registry.verify(id, event_id, &bob()));
    }

    #[test]
    fn verify_is_false_for_unknown_token_or_wrong_event() {
        let mut registry = TokenRegistry::new();
        let mut events = Vec::new();
        let id = registry.issue(&alice(), EventId::new(1), at(), &mut events).unwrap();

        assert!(!registry.verify(TokenId::new(42), EventId::new(1), &alice()));
        assert!(!registry.verify(id, EventId::new(2), &alice()));
    }
}
