use ti2_scope::Microscope;
use ti2_transport::BulkTransport;
use tracing::debug;

use crate::cmd::{MoveArgs, Session};
use crate::exit::{scope_error, CliResult, SUCCESS};
use crate::output::{print_one, OutputFormat};

pub async fn run(args: MoveArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let scope = session.open()?;
    move_to(&scope, &args).await?;

    if args.wait {
        let status = scope
            .stable_status()
            .await
            .map_err(|err| scope_error("status read failed", err))?;
        print_one(&status, format);
    }

    Ok(SUCCESS)
}

/// Issue the requested axis moves in x, y, z order.
async fn move_to<T: BulkTransport + 'static>(
    scope: &Microscope<T>,
    args: &MoveArgs,
) -> CliResult<()> {
    let map = |err| scope_error("move failed", err);
    if let Some(x) = args.x {
        debug!(x, "moving x");
        scope.set_x(x).await.map_err(map)?;
    }
    if let Some(y) = args.y {
        debug!(y, "moving y");
        scope.set_y(y).await.map_err(map)?;
    }
    if let Some(z) = args.z {
        debug!(z, "moving z");
        scope.set_z(z).await.map_err(map)?;
    }
    Ok(())
}
