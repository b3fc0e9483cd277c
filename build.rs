use anyhow::{Context, Result};
use meshlight_config::{codegen::generate_modules, Configuration};
use std::{
    env,
    fs::File,
    io::{BufReader, Read},
};

const DEFAULT_CONFIG_FILENAME: &str = "native_sim_default_config.ron";

fn main() -> Result<()> {
    process_configuration_file()?;
    Ok(())
}

fn process_configuration_file() -> Result<()> {
    println!("cargo:rerun-if-env-changed=MESHLIGHT_CONFIG");
    println!(
        "cargo:rerun-if-changed=./meshlight_config/sample_configurations/{}",
        DEFAULT_CONFIG_FILENAME
    );

    let filename = if let Ok(filename) = env::var("MESHLIGHT_CONFIG") {
        println!("cargo:rerun-if-changed={}", filename);
        filename
    } else {
        format!("./meshlight_config/sample_configurations/{}", DEFAULT_CONFIG_FILENAME)
    };

    let file = File::open(&filename).with_context(|| format!("Opening `{}`", filename))?;
    let mut buf_reader = BufReader::new(file);
    let mut contents = String::new();
    buf_reader.read_to_string(&mut contents)?;
    let configuration: Configuration = ron::from_str(&contents)?;

    let steps: Vec<String> =
        configuration.required_configuration_steps().map(|s| s.to_string()).collect();
    anyhow::ensure!(steps.is_empty(), "Incomplete configuration: {}", steps.join(", "));

    generate_modules(env::var("OUT_DIR")?, &configuration)?;
    Ok(())
}
