//! Signup command - fills in the sign-up form and submits it.

use std::{collections::BTreeSet, time::Duration};

use formtree::{ErrorTree, FormSnapshot, Value, path};
use tracing::{debug, info};

use crate::{
    cli::{Format, SignupArgs},
    output::{print_json, print_table},
    signup,
};

/// Run the signup command
pub async fn run(args: &SignupArgs) -> Result<(), Box<dyn std::error::Error>> {
    let taken: BTreeSet<String> = args
        .taken
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    debug!(taken = taken.len(), latency_ms = args.latency_ms, "building sign-up form");
    let form = signup::build(taken, Duration::from_millis(args.latency_ms))?;

    form.set_value(&path!("username"), args.username.as_str())?;
    form.set_value(&path!("contactInfo", "email"), args.email.as_str())?;
    for name in &args.friends {
        signup::add_friend(&form, name)?;
    }

    info!(
        username = %args.username,
        friends = args.friends.len(),
        "submitting sign-up form"
    );
    let submitted = form
        .submit(|errors, values, form| (errors, values, form.snapshot()))
        .await;

    let (errors, values, snapshot) = match submitted {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("submission failed: {e}");
            std::process::exit(2);
        }
    };

    match args.format {
        Format::Json => print_json(&snapshot)?,
        Format::Human => print_human(errors.as_ref(), &values, &snapshot)?,
    }

    if errors.is_some() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_human(
    errors: Option<&ErrorTree>,
    values: &Value,
    snapshot: &FormSnapshot,
) -> Result<(), serde_json::Error> {
    match errors {
        Some(errors) => {
            println!("Form is invalid ({} errors):", errors.count());
            let rows: Vec<Vec<String>> = errors
                .flatten()
                .into_iter()
                .map(|(path, error)| vec![path.to_string(), error.error.clone()])
                .collect();
            print_table(&["FIELD", "ERROR"], &rows);
        }
        None => println!("Form is valid."),
    }
    println!();
    println!("Submit count: {}", snapshot.submit_count);
    println!("Values:");
    print_json(values)
}
