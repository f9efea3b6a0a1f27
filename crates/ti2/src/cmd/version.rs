use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ti2 {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: ti2");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("TI2_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("TI2_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "usb: vendor={:04x} product={:04x}",
        ti2_transport::VENDOR_ID,
        ti2_transport::PRODUCT_ID
    );
    println!("features: usb={}, cli=true", cfg!(feature = "usb"));

    Ok(SUCCESS)
}
