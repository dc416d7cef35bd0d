use gltf_stage::{config::StageConfig, flow};

fn main() -> anyhow::Result<()> {
    flow::run(StageConfig::from_env())
}
