//! Config load validation tests for mandate-gate-config.
// crates/mandate-gate-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use mandate_gate_config::ConfigError;
use mandate_gate_config::MandateGateConfig;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

/// Complete, valid secrets section used as a base for tests.
const VALID_SECRETS: &str = r#"
[secrets]
user_secret = "user-secret-0123456789abcdef"
agent_secret = "agent-secret-0123456789abcdef"
payment_authority_secret = "authority-secret-0123456789abcdef"
"#;

fn assert_invalid(result: Result<MandateGateConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(MandateGateConfig::load(Some(path)), "config path exceeds max length")?;
    Ok(())
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(MandateGateConfig::load(Some(path)), "config path component too long")?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'a'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(MandateGateConfig::load(Some(file.path())), "config file exceeds size limit")?;
    Ok(())
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(MandateGateConfig::load(Some(file.path())), "config file must be utf-8")?;
    Ok(())
}

#[test]
fn missing_secrets_section_is_fatal() -> TestResult {
    assert_invalid(MandateGateConfig::from_toml("[pricing]\ntax_rate_bps = 800\n"), "secrets")?;
    Ok(())
}

#[test]
fn missing_role_secret_is_fatal() -> TestResult {
    let content = r#"
[secrets]
user_secret = "user-secret-0123456789abcdef"
agent_secret = "agent-secret-0123456789abcdef"
"#;
    assert_invalid(MandateGateConfig::from_toml(content), "payment_authority_secret")?;
    Ok(())
}

#[test]
fn weak_secret_is_rejected() -> TestResult {
    let content = r#"
[secrets]
user_secret = "short"
agent_secret = "agent-secret-0123456789abcdef"
payment_authority_secret = "authority-secret-0123456789abcdef"
"#;
    assert_invalid(MandateGateConfig::from_toml(content), "at least 16 bytes")?;
    Ok(())
}

#[test]
fn reused_role_secret_is_rejected() -> TestResult {
    let content = r#"
[secrets]
user_secret = "shared-secret-0123456789abcdef"
agent_secret = "shared-secret-0123456789abcdef"
payment_authority_secret = "authority-secret-0123456789abcdef"
"#;
    assert_invalid(MandateGateConfig::from_toml(content), "must be distinct")?;
    Ok(())
}

#[test]
fn defaults_fill_every_optional_section() -> TestResult {
    let config = MandateGateConfig::from_toml(VALID_SECRETS).map_err(|err| err.to_string())?;
    if config.pricing.tax_rate_bps != 800 {
        return Err("expected default tax rate".to_string());
    }
    if config.pricing.flat_shipping_cents != 1_000 {
        return Err("expected default shipping".to_string());
    }
    if config.monitor.check_interval_secs != 300 {
        return Err("expected default check interval".to_string());
    }
    if config.monitor.max_concurrent_checks != 4 {
        return Err("expected default concurrency bound".to_string());
    }
    if config.store.busy_timeout_ms != 5_000 {
        return Err("expected default busy timeout".to_string());
    }
    Ok(())
}

#[test]
fn excessive_tax_rate_is_rejected() -> TestResult {
    let content = format!("{VALID_SECRETS}\n[pricing]\ntax_rate_bps = 10001\n");
    assert_invalid(MandateGateConfig::from_toml(&content), "tax_rate_bps")?;
    Ok(())
}

#[test]
fn zero_intervals_are_rejected() -> TestResult {
    let content = format!("{VALID_SECRETS}\n[monitor]\ncheck_interval_secs = 0\n");
    assert_invalid(MandateGateConfig::from_toml(&content), "check_interval_secs")?;
    let content = format!("{VALID_SECRETS}\n[monitor]\ntick_interval_secs = 0\n");
    assert_invalid(MandateGateConfig::from_toml(&content), "tick_interval_secs")?;
    Ok(())
}

#[test]
fn pricing_config_converts_to_policy() -> TestResult {
    let content = format!(
        "{VALID_SECRETS}\n[pricing]\ntax_rate_bps = 800\nflat_shipping_cents = 1000\n"
    );
    let config = MandateGateConfig::from_toml(&content).map_err(|err| err.to_string())?;
    let policy = config.pricing.policy();
    if policy.landed_cost(4_000) != 5_320 {
        return Err("expected landed cost 5320 for 4000".to_string());
    }
    Ok(())
}

#[test]
fn signing_keys_cover_all_three_roles() -> TestResult {
    let config = MandateGateConfig::from_toml(VALID_SECRETS).map_err(|err| err.to_string())?;
    // Sign with each role and confirm the digests differ, proving the keys
    // are wired to distinct secrets.
    let keys = config.secrets.signing_keys();
    let now = mandate_gate_core::Timestamp::from_unix_seconds(1_700_000_000)
        .map_err(|err| err.to_string())?;
    let record = serde_json::json!({"mandate_id": "intent_hnp_abc"});
    let signer = mandate_gate_core::SignerId::new("signer_1");
    let mut digests = Vec::new();
    for role in [
        mandate_gate_core::SignerRole::User,
        mandate_gate_core::SignerRole::Agent,
        mandate_gate_core::SignerRole::PaymentAuthority,
    ] {
        let signature = mandate_gate_core::sign_record(&record, role, &signer, now, &keys)
            .map_err(|err| err.to_string())?;
        digests.push(signature.signature_value);
    }
    digests.sort_unstable();
    digests.dedup();
    if digests.len() != 3 {
        return Err("expected three distinct role digests".to_string());
    }
    Ok(())
}
