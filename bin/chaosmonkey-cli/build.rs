//! ---
//! cm_section: "05-cli"
//! cm_subsection: "binary"
//! cm_type: "source"
//! cm_scope: "build"
//! cm_description: "Build script capturing version metadata."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Builds from a source tarball have no git metadata; vergen then emits
    // placeholder values instead of failing.
    EmitBuilder::builder()
        .all_build()
        .all_cargo()
        .git_sha(true)
        .emit()?;
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
