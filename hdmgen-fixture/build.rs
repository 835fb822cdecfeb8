//! Generates the fixture object model into `OUT_DIR/model`.

mod schema;

use hdmgen_codegen::{EmitterKind, FsWriter, Generator};
use std::env::var;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

/// Every emitter except serialization, whose wire schema needs the capnp
/// compiler.
const EMITTERS: [EmitterKind; 8] = [
    EmitterKind::TypeTable,
    EmitterKind::Model,
    EmitterKind::Dispatch,
    EmitterKind::Clone,
    EmitterKind::Compare,
    EmitterKind::ContainerAdoption,
    EmitterKind::Visitor,
    EmitterKind::Tracer,
];

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=schema.rs");

    let out_dir = PathBuf::from(var("OUT_DIR")?);
    let model_dir = out_dir.join("model");

    Generator::builder()
        .policy(schema::policy())
        .only(&EMITTERS)
        .build(&schema::schema()?)?
        .run()?
        .write_all(&mut FsWriter::new(&model_dir))?;

    // `#[path]` takes a literal, so the include carries the absolute path.
    let module = model_dir.join("mod.rs").display().to_string();
    let include = format!("/// Generated object model.\n#[path = {module:?}]\npub mod model;\n");
    fs::write(out_dir.join("fixture.rs"), include)?;
    Ok(())
}
