use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The build host is not assumed to carry a protoc; use the vendored one.
    let protoc = protoc_bin_vendored::protoc_bin_path()?;
    // SAFETY: build scripts run single-threaded, before any crate code.
    unsafe { env::set_var("PROTOC", &protoc) };

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .out_dir(&out_dir)
        .compile_protos(&["proto/gnmi.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/gnmi.proto");

    Ok(())
}
