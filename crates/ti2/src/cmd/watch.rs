use ti2_scope::ScopeError;
use tracing::{info, warn};

use crate::cmd::{Session, WatchArgs};
use crate::exit::{scope_error, CliResult, SUCCESS};
use crate::output::{print_one, OutputFormat};

pub async fn run(args: WatchArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let scope = session.open()?;
    let mut events = scope.events();
    let mut printed = 0usize;

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }

        tokio::select! {
            _ = &mut interrupted => {
                info!(printed, "interrupted");
                break;
            }
            event = events.next_event() => match event {
                Ok(status) => {
                    print_one(&status, format);
                    printed = printed.saturating_add(1);
                }
                Err(ScopeError::NoStatus(timeout)) => {
                    warn!(?timeout, "no status event");
                }
                Err(err) => return Err(scope_error("event read failed", err)),
            },
        }
    }

    Ok(SUCCESS)
}
