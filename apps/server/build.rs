use std::env::vars;

use dotenvy::dotenv;

/// Only these variables from `.env` are baked into the binary
const PREFIX: &str = "NODEWATCH_";

fn main() {
    println!("cargo:rerun-if-changed=.env");
    dotenv().ok();

    for (k, v,) in vars().filter(|(k, _,)| k.starts_with(PREFIX,),) {
        println!("cargo:rustc-env={k}={v}");
    }
}
