use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::model::{DimensionPlan, Element, ElementType};
use crate::error::{CubeError, Result};
use crate::fits::{image, FitsWriter, ImageSpec};

// ---------------------------------------------------------------------------
// OutputContainer – the FITS file being assembled
// ---------------------------------------------------------------------------

/// An output file under construction.
///
/// Invariant: HDU 1 is always the empty placeholder written by
/// [`OutputContainer::create_fresh`]; cubes follow it as `IMAGE`
/// extensions, in the order they are added, and none is revisited once the
/// next one has been started.
pub struct OutputContainer {
    path: PathBuf,
    writer: FitsWriter<BufWriter<File>>,
    cubes: Vec<String>,
}

impl OutputContainer {
    /// Create `path`, replacing any existing file, and write the placeholder
    /// primary HDU.
    pub fn create_fresh(path: &Path) -> Result<Self> {
        let file = create_clobbering(path)?;
        let mut writer = FitsWriter::new(BufWriter::new(file));

        info!("Creating primary hdu");
        writer
            .append_hdu(&image::primary_placeholder(), &[])
            .map_err(|e| CubeError::fits(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            cubes: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of the cubes added so far.
    pub fn cube_names(&self) -> &[String] {
        &self.cubes
    }

    /// Append a zero-filled `[epochs × objects]` image extension named
    /// `name` and return a handle for filling its object columns.
    pub fn add_cube(
        &mut self,
        name: &str,
        element: ElementType,
        plan: &DimensionPlan,
    ) -> Result<CubeBlock<'_>> {
        if plan.objects == 0 || plan.epochs == 0 {
            return Err(CubeError::Shape(format!("cannot create {name} with shape {plan}")));
        }
        let axes = plan.axes();
        let spec = ImageSpec {
            name,
            bitpix: element.bitpix(),
            axes: &axes,
            blank: element.blank(),
        };
        let data_len = spec
            .data_len()
            .ok_or_else(|| CubeError::Shape(format!("{name} with shape {plan} is too large")))?;

        let data_offset = self
            .writer
            .allocate_hdu(&spec.header(), data_len)
            .map_err(|e| CubeError::fits(&self.path, e))?;
        self.cubes.push(name.to_string());

        Ok(CubeBlock {
            container: self,
            data_offset,
            element,
            plan: *plan,
        })
    }

    /// Flush everything to disk and close the file.
    pub fn finalize(self) -> Result<PathBuf> {
        let path = self.path;
        let buffered = self.writer.finish().map_err(|e| CubeError::fits(&path, e))?;
        let file = buffered
            .into_inner()
            .map_err(|e| CubeError::io(&path, e.into_error()))?;
        file.sync_all().map_err(|e| CubeError::io(&path, e))?;
        Ok(path)
    }
}

/// Open `path` for writing, refusing to reuse an existing file: if one is
/// there it is deleted and creation is retried once.
fn create_clobbering(path: &Path) -> Result<File> {
    let mut removed = false;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => return Ok(file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && !removed => {
                warn!("File {} exists, overwriting", path.display());
                fs::remove_file(path).map_err(|e| CubeError::io(path, e))?;
                removed = true;
            }
            Err(e) => return Err(CubeError::io(path, e)),
        }
    }
}

// ---------------------------------------------------------------------------
// CubeBlock – one image extension being filled
// ---------------------------------------------------------------------------

/// Write access to the most recently added cube.
pub struct CubeBlock<'a> {
    container: &'a mut OutputContainer,
    data_offset: u64,
    element: ElementType,
    plan: DimensionPlan,
}

impl CubeBlock<'_> {
    pub fn plan(&self) -> &DimensionPlan {
        &self.plan
    }

    /// Write `values` as the full epoch run of object column `index`.
    pub fn write_object<T: Element>(&mut self, index: usize, values: &[T]) -> Result<()> {
        if T::TYPE != self.element {
            return Err(CubeError::Shape(format!(
                "cannot store {} values in a {} cube",
                T::TYPE,
                self.element
            )));
        }
        if index >= self.plan.objects || values.len() != self.plan.epochs {
            return Err(CubeError::Shape(format!(
                "object {index} with {} values does not fit a cube of {}",
                values.len(),
                self.plan
            )));
        }

        let size = self.element.bitpix().size();
        let mut bytes = Vec::with_capacity(values.len() * size);
        for v in values {
            v.put_be(&mut bytes);
        }
        let offset = self.data_offset + (index * self.plan.epochs * size) as u64;
        self.container
            .writer
            .write_at(offset, &bytes)
            .map_err(|e| CubeError::fits(&self.container.path, e))
    }
}
