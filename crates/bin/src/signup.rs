//! The sign-up form: a username with an availability check, a contact email
//! and a list of friends.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use formtree::{
    FieldDescriptor, FieldSetModel, FormModel, Key, Node, NodeKind, Result, Validation,
    ValidationError, Validator, Value, path,
    validation::{self, BoxError},
};

pub const USERNAME_TAKEN: &str = "That username is taken.";

/// Username rules, then an availability check that takes `latency`.
pub fn username_validator(taken: BTreeSet<String>, latency: Duration) -> Validator {
    let taken = Arc::new(taken);
    validation::validator(move |value, _, _, _| {
        let username = value.as_text_or_empty().trim().to_string();
        if username.contains(char::is_whitespace) {
            return Ok(Validation::invalid("Username may not contain spaces."));
        }
        if username.is_empty() {
            return Ok(Validation::invalid("Please choose a username."));
        }
        if username.chars().count() < 3 {
            return Ok(Validation::invalid(
                "Username must be at least three characters long.",
            ));
        }

        let taken = taken.clone();
        Ok(Validation::pending(async move {
            tokio::time::sleep(latency).await;
            Ok::<_, BoxError>(
                taken
                    .contains(&username)
                    .then(|| ValidationError::new(USERNAME_TAKEN)),
            )
        }))
    })
}

pub fn email_validator() -> Validator {
    validation::rules::email("Please enter a valid email.")
}

/// At least three friends; during submission every friend needs a name.
pub fn friends_validator() -> Validator {
    validation::validator(|value, _, _, form| {
        let friends = value.as_list().unwrap_or_default();
        if friends.len() < 3 {
            return Ok(Validation::invalid("Please name at least three friends."));
        }
        let unnamed = friends.iter().any(|friend| {
            friend
                .child(&Key::from("name"))
                .is_none_or(|name| name.as_text_or_empty().trim().is_empty())
        });
        if form.is_submitting && unnamed {
            return Ok(Validation::invalid("Please name all friends."));
        }
        Ok(Validation::Valid)
    })
}

pub fn friend_name_validator() -> Validator {
    validation::validator(|value, _, _, _| {
        Ok(if value.as_text_or_empty().trim().is_empty() {
            Validation::invalid("What is your friend's name?")
        } else {
            Validation::Valid
        })
    })
}

/// Builds the form and registers its fields.
pub fn build(taken: BTreeSet<String>, latency: Duration) -> Result<FormModel> {
    let form = FormModel::builder()
        .init(Value::map([
            ("username", Value::from("")),
            ("contactInfo", Value::map([("email", "")])),
            ("friends", Value::empty_list()),
        ]))
        .build()?;

    form.register_field(
        FieldDescriptor::field(path!("username")).validator(username_validator(taken, latency)),
    )?;
    form.register_field(FieldDescriptor::field_set(path!("contactInfo")))?;
    form.register_field(
        FieldDescriptor::field(path!("contactInfo", "email")).validator(email_validator()),
    )?;
    form.register_field(
        FieldDescriptor::field_array(path!("friends")).validator(friends_validator()),
    )?;
    Ok(form)
}

/// Appends a friend entry and registers its name field.
pub fn add_friend(form: &FormModel, name: &str) -> Result<Node> {
    let friends = form.field_array(&path!("friends"))?;
    let friend = friends.push_field(
        NodeKind::FieldSet,
        Some(Value::map([("name", name)])),
        None,
    )?;
    let friend = FieldSetModel::try_from(friend)?;
    friend.register("name", NodeKind::Field, None, Some(friend_name_validator()))
}
