// Shader module loading
//
// Shaders are compiled to SPIR-V by build.rs and read back from
// shaders/<name>.spv at startup.

use std::io::Cursor;
use std::path::Path;

use ash::vk;

use super::error::BackendError;

/// Read a compiled SPIR-V binary from disk and create a shader module.
pub fn load_shader_module(
    device: &ash::Device,
    path: impl AsRef<Path>,
) -> Result<vk::ShaderModule, BackendError> {
    let path = path.as_ref();

    let bytes = std::fs::read(path).map_err(|source| BackendError::ShaderLoad {
        path: path.to_path_buf(),
        source,
    })?;

    // SPIR-V is a stream of 4-byte words; read_spv handles alignment and
    // truncated files instead of a raw pointer cast
    let code = ash::util::read_spv(&mut Cursor::new(&bytes)).map_err(|source| {
        BackendError::ShaderLoad {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let create_info = vk::ShaderModuleCreateInfo::default().code(&code);

    let module = unsafe { device.create_shader_module(&create_info, None)? };

    log::info!("Loaded shader module from {}", path.display());
    Ok(module)
}
