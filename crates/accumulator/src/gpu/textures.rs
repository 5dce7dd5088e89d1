use crate::error::RendererError;

use super::backend::{AccumulationDescriptor, GpuBackend};

/// Format of both accumulation textures. Must match the storage format the
/// accumulating shader declares.
pub const ACCUMULATION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

const TEXTURE_LABELS: [&str; 2] = ["accumulation texture A", "accumulation texture B"];

/// Descriptor shared by both members of the pair.
pub(crate) fn accumulation_descriptor(width: u32, height: u32) -> AccumulationDescriptor {
    AccumulationDescriptor {
        width,
        height,
        format: ACCUMULATION_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::STORAGE_BINDING,
    }
}

/// The two ping-pong accumulation textures.
///
/// Both are created together from one descriptor and are only ever replaced
/// together. Dropping the set releases the handles; the device keeps the
/// memory alive until submissions that reference it have finished.
pub struct AccumulationTextureSet<B: GpuBackend> {
    _textures: [B::Texture; 2],
    views: [B::TextureView; 2],
    descriptor: AccumulationDescriptor,
}

impl<B: GpuBackend> AccumulationTextureSet<B> {
    pub fn create(backend: &B, width: u32, height: u32) -> Result<Self, RendererError> {
        let max = backend.max_texture_dimension();
        if width > max || height > max {
            return Err(RendererError::exhausted(
                "accumulation textures",
                format!("{width}x{height} exceeds the device limit of {max}"),
            ));
        }

        let descriptor = accumulation_descriptor(width, height);
        let first = backend.create_accumulation_texture(TEXTURE_LABELS[0], &descriptor)?;
        let second = backend.create_accumulation_texture(TEXTURE_LABELS[1], &descriptor)?;
        let views = [
            backend.create_texture_view(&first),
            backend.create_texture_view(&second),
        ];

        tracing::debug!(width, height, format = ?descriptor.format, "allocated accumulation textures");

        Ok(Self {
            _textures: [first, second],
            views,
            descriptor,
        })
    }

    pub fn view(&self, index: usize) -> &B::TextureView {
        &self.views[index]
    }

    pub fn size(&self) -> (u32, u32) {
        (self.descriptor.width, self.descriptor.height)
    }

    pub fn descriptor(&self) -> &AccumulationDescriptor {
        &self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::{Call, RecordingBackend};

    #[test]
    fn pair_shares_one_descriptor() {
        let backend = RecordingBackend::new();
        let set = AccumulationTextureSet::create(&backend, 320, 240).unwrap();
        assert_eq!(set.size(), (320, 240));

        let created: Vec<AccumulationDescriptor> = backend
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CreateTexture { descriptor, .. } => Some(descriptor),
                _ => None,
            })
            .collect();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0], created[1]);
        assert!(created[0]
            .usage
            .contains(wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::STORAGE_BINDING));
    }

    #[test]
    fn views_refer_to_distinct_textures() {
        let backend = RecordingBackend::new();
        let set = AccumulationTextureSet::create(&backend, 8, 8).unwrap();
        assert_ne!(set.view(0).texture, set.view(1).texture);
    }

    #[test]
    fn oversized_pair_is_rejected_before_allocating() {
        let backend = RecordingBackend::with_max_dimension(1024);
        let err = match AccumulationTextureSet::create(&backend, 2048, 16) {
            Err(err) => err,
            Ok(_) => panic!("oversized textures were allocated"),
        };
        assert!(matches!(err, RendererError::ResourceExhausted { .. }));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn allocation_failure_surfaces_as_resource_exhausted() {
        let backend = RecordingBackend::new();
        backend.fail_texture_allocation(true);
        let err = match AccumulationTextureSet::create(&backend, 64, 64) {
            Err(err) => err,
            Ok(_) => panic!("allocation should have failed"),
        };
        assert!(matches!(
            err,
            RendererError::ResourceExhausted {
                resource: "accumulation texture A",
                ..
            }
        ));
    }
}
