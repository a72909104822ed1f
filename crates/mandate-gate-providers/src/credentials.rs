// crates/mandate-gate-providers/src/credentials.rs
// ============================================================================
// Module: Static Credentials Provider
// Description: In-process tokenized payment method registry.
// Purpose: Provide a deterministic credentials collaborator for tests and demos.
// Dependencies: mandate-gate-core
// ============================================================================

//! ## Overview
//! [`StaticCredentials`] maps users to tokenized payment methods. Only
//! `tok_*` references are held; raw card data never appears anywhere in the
//! system. Each configured user carries exactly one default method, which is
//! the one autonomous purchases use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use mandate_gate_core::CredentialToken;
use mandate_gate_core::CredentialsError;
use mandate_gate_core::CredentialsProvider;
use mandate_gate_core::PaymentMethod;
use mandate_gate_core::UserId;

// ============================================================================
// SECTION: Static Credentials
// ============================================================================

/// In-process registry of tokenized payment methods.
///
/// # Invariants
/// - Users absent from the registry fail closed with
///   [`CredentialsError::NoMethods`].
#[derive(Debug, Default)]
pub struct StaticCredentials {
    /// Methods per user.
    methods: BTreeMap<UserId, Vec<PaymentMethod>>,
}

impl StaticCredentials {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user's methods, replacing any previous registration.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId, methods: Vec<PaymentMethod>) -> Self {
        self.methods.insert(user_id, methods);
        self
    }

    /// Creates the built-in demo registry.
    #[must_use]
    pub fn demo() -> Self {
        /// Shorthand for one tokenized method row.
        fn method(
            token: &str,
            kind: &str,
            last_four: &str,
            expiry_month: u8,
            expiry_year: u16,
            is_default: bool,
        ) -> PaymentMethod {
            PaymentMethod {
                token: CredentialToken::new(token),
                kind: kind.to_string(),
                last_four: last_four.to_string(),
                expiry_month,
                expiry_year,
                is_default,
            }
        }
        Self::new()
            .with_user(
                UserId::new("user_demo_001"),
                vec![
                    method("tok_visa_4242", "visa", "4242", 12, 2_027, true),
                    method("tok_mc_5555", "mastercard", "5555", 8, 2_026, false),
                ],
            )
            .with_user(
                UserId::new("user_demo_002"),
                vec![
                    method("tok_amex_3782", "amex", "3782", 3, 2_028, true),
                    method("tok_visa_1111", "visa", "1111", 6, 2_025, false),
                ],
            )
            .with_user(
                UserId::new("user_demo_003"),
                vec![method("tok_visa_9999", "visa", "9999", 4, 2_026, true)],
            )
    }
}

impl CredentialsProvider for StaticCredentials {
    fn methods_for(&self, user_id: &UserId) -> Result<Vec<PaymentMethod>, CredentialsError> {
        match self.methods.get(user_id) {
            Some(methods) if !methods.is_empty() => Ok(methods.clone()),
            _ => Err(CredentialsError::NoMethods(user_id.clone())),
        }
    }
}
