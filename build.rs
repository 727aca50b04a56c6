use std::env;

fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();

    // header generation is best effort
    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("GCODE2THUMBNAIL_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(format!("{}/target/gcode2thumbnail.h", crate_dir));
        }
        Err(err) => println!("cargo:warning=unable to generate C header: {}", err),
    }

    println!("cargo:rerun-if-changed=src/ffi.rs");
}
