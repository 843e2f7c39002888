use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use tokenkit_auth::types::ACCOUNT_ID;
use tokenkit_auth::{IssueOptions, TokenContext, TokenService, UserRef};

use crate::cli::{IssueArgs, OutputFormat, VerifyArgs};
use crate::output::{print_success, print_value};

pub fn issue(service: &TokenService, args: &IssueArgs, format: OutputFormat) -> Result<()> {
    let context = TokenContext::parse(&args.context)?;
    let user = UserRef::new(
        args.user_id.unwrap_or_else(uuid::Uuid::new_v4),
        &args.user_email,
    );

    let mut options = IssueOptions::new();
    if let Some(sent_to) = &args.sent_to {
        options = options.sent_to(sent_to);
    }
    if let Some(account) = args.account {
        options = options.for_account(account);
    }
    if let Some(target) = args.impersonate {
        options = options.impersonating(target);
    }

    let issued = service
        .issue(context, &user, options)
        .with_context(|| format!("Failed to issue {} token", args.context))?;

    // Raw-encoded contexts have no text form; show their bytes as hex.
    let secret = issued
        .secret
        .as_text()
        .map_or_else(|| hex::encode(issued.secret.as_bytes()), str::to_string);

    match format {
        OutputFormat::Json => print_value(
            &json!({
                "secret": secret,
                "record": serde_json::to_value(&issued.record)?,
            }),
            format,
        ),
        OutputFormat::Table => {
            print_success(&format!("Issued {} token", issued.record.context));
            println!("{}: {}", "Secret".cyan(), secret);
            print_value(&serde_json::to_value(&issued.record)?, format)
        }
    }
}

pub fn verify(service: &TokenService, args: &VerifyArgs, format: OutputFormat) -> Result<()> {
    let context = TokenContext::parse(&args.context)?;
    let token = args.token.trim();
    let presented = if context.policy().encoding.is_text_encoded() {
        token.as_bytes().to_vec()
    } else {
        hex::decode(token).context("Raw-encoded tokens are given as hex")?
    };

    let mut predicate = if args.current {
        service.verify_current(&presented, &context)?
    } else {
        service.verify(&presented, &context)?
    };
    if let Some(account) = args.account {
        predicate = predicate.with_annotation(ACCOUNT_ID, account.to_string());
    }

    let constraints = serde_json::to_value(predicate.constraints())?;
    match format {
        OutputFormat::Json => print_value(&json!({ "constraints": constraints }), format),
        OutputFormat::Table => print_value(&constraints, format),
    }
}
