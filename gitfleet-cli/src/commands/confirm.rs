//! Interactive confirmation through `dialoguer`.

use colored::Colorize;
use dialoguer::{Confirm, Input};

use gitfleet_sync::confirm::default_message;
use gitfleet_sync::{ConfirmRequest, ConfirmResponse, Confirmer};

/// Asks on the terminal for every pending repository.
#[derive(Debug, Clone, Default)]
pub struct PromptConfirmer {
    message: Option<String>,
}

impl PromptConfirmer {
    /// `message`, when given, is used for every commit without asking.
    pub fn new(message: Option<String>) -> Self {
        Self { message }
    }

    fn ask(&self, request: &ConfirmRequest) -> dialoguer::Result<ConfirmResponse> {
        println!();
        println!(
            "{} {}  {}",
            "■".yellow().bold(),
            request.name.bold(),
            request.status.to_string().yellow()
        );
        for line in request.summary.lines() {
            println!("    {line}");
        }

        let proceed = Confirm::new()
            .with_prompt(format!("Run {} on {}?", request.action, request.name))
            .default(false)
            .interact()?;
        if !proceed {
            return Ok(ConfirmResponse::decline());
        }
        if !request.needs_message() {
            return Ok(ConfirmResponse::accept(String::new()));
        }
        if let Some(message) = &self.message {
            return Ok(ConfirmResponse::accept(message.clone()));
        }
        let message: String = Input::new()
            .with_prompt("Commit message")
            .default(default_message(&request.name))
            .interact_text()?;
        Ok(ConfirmResponse::accept(message))
    }
}

impl Confirmer for PromptConfirmer {
    fn confirm(&mut self, request: &ConfirmRequest) -> ConfirmResponse {
        match self.ask(request) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(repo = %request.name, error = %err, "prompt failed; declining");
                ConfirmResponse::decline()
            }
        }
    }
}
