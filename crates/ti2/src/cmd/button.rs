use serde::Serialize;
use ti2_scope::BUTTON_SLOTS;

use crate::cmd::{ButtonArgs, Session};
use crate::exit::{scope_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_one, OutputFormat, Record};

#[derive(Debug, Serialize)]
struct Assignment {
    button: u8,
    function: u8,
}

impl Record for Assignment {
    fn columns() -> &'static [&'static str] {
        &["BUTTON", "FUNCTION"]
    }

    fn cells(&self) -> Vec<String> {
        vec![self.button.to_string(), format!("{:#04x}", self.function)]
    }
}

pub async fn run(args: ButtonArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    if args.index >= BUTTON_SLOTS {
        return Err(CliError::new(
            USAGE,
            format!(
                "button index {} out of range (0-{})",
                args.index,
                BUTTON_SLOTS - 1
            ),
        ));
    }

    let scope = session.open()?;
    scope
        .set_button_function(args.index, args.function)
        .await
        .map_err(|err| scope_error("button assignment failed", err))?;

    print_one(
        &Assignment {
            button: args.index,
            function: args.function,
        },
        format,
    );
    Ok(SUCCESS)
}
