use std::path::Path;

use pdf::LayoutConfig;

use crate::prelude::*;

/// Layout calibration from `--config`, or the defaults.
pub fn load_config(global: &crate::Global) -> Result<LayoutConfig> {
    let Some(path) = &global.config else {
        return Ok(LayoutConfig::default());
    };
    let config = LayoutConfig::load(path).map_err(|source| Error::Config {
        path: path.clone(),
        source,
    })?;
    log::debug!("loaded layout config from {}", path.display());
    Ok(config)
}

/// Read an input file, refusing names without a PDF extension unless
/// `force` is set.
pub fn read_pdf(path: &Path, force: bool) -> Result<Vec<u8>> {
    let extension = path.extension().and_then(|e| e.to_str());
    if !pdf::accepts(extension, None) {
        if !force {
            return Err(Error::NotPdf(path.to_path_buf()).into());
        }
        log::warn!("{} has no .pdf extension; converting anyway", path.display());
    }

    std::fs::read(path).map_err(|source| {
        Error::Read {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}
