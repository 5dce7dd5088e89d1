use crate::error::RendererError;
use crate::types::DisplayVariant;

use super::backend::{DisplayPipelineDescriptor, GpuBackend};
use super::program::ShaderProgram;
use super::textures::ACCUMULATION_FORMAT;

pub const UNIFORM_BINDING: u32 = 0;
pub const HISTORY_BINDING: u32 = 1;
pub const TARGET_BINDING: u32 = 2;

/// Vertices in the full-screen quad (two triangles, no vertex buffer).
pub const FULLSCREEN_VERTEX_COUNT: u32 = 6;

/// Bind group layout for `variant`: the uniform block at slot 0 and, when
/// accumulating, the history texture at slot 1 and the write-only
/// accumulation target at slot 2.
pub(crate) fn binding_layout_entries(variant: DisplayVariant) -> Vec<wgpu::BindGroupLayoutEntry> {
    let uniform_size = variant.uniform_layout().byte_len() as u64;
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: UNIFORM_BINDING,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(uniform_size),
        },
        count: None,
    }];

    if variant.accumulates() {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: HISTORY_BINDING,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: TARGET_BINDING,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: ACCUMULATION_FORMAT,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        });
    }

    entries
}

/// Compiled display program plus the bind group layout it was built against.
/// Immutable once built; a shader or surface format change builds a new one.
pub struct DisplayPipeline<B: GpuBackend> {
    pub(crate) pipeline: B::Pipeline,
    pub(crate) layout: B::BindGroupLayout,
    variant: DisplayVariant,
    target_format: wgpu::TextureFormat,
}

impl<B: GpuBackend> DisplayPipeline<B> {
    pub fn build(
        backend: &B,
        program: &ShaderProgram,
        target_format: wgpu::TextureFormat,
        variant: DisplayVariant,
    ) -> Result<Self, RendererError> {
        let module = backend.compile_shader(program)?;
        let layout = backend
            .create_bind_group_layout("display bind group layout", &binding_layout_entries(variant))?;
        let pipeline = backend.create_display_pipeline(
            &module,
            &layout,
            &DisplayPipelineDescriptor {
                label: "display pipeline",
                vertex_entry: program.vertex_entry(),
                fragment_entry: program.fragment_entry(),
                target_format,
            },
        )?;

        tracing::debug!(
            shader = program.label(),
            ?target_format,
            ?variant,
            "built display pipeline"
        );

        Ok(Self {
            pipeline,
            layout,
            variant,
            target_format,
        })
    }

    pub fn variant(&self) -> DisplayVariant {
        self.variant
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulating_layout_has_uniform_history_and_target_slots() {
        let entries = binding_layout_entries(DisplayVariant::Accumulate);
        let slots: Vec<u32> = entries.iter().map(|entry| entry.binding).collect();
        assert_eq!(slots, vec![UNIFORM_BINDING, HISTORY_BINDING, TARGET_BINDING]);

        assert!(entries
            .iter()
            .all(|entry| entry.visibility == wgpu::ShaderStages::FRAGMENT));
        assert!(matches!(
            entries[0].ty,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                min_binding_size: Some(size),
                ..
            } if size.get() == 12
        ));
        assert!(matches!(
            entries[1].ty,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                ..
            }
        ));
        assert!(matches!(
            entries[2].ty,
            wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: ACCUMULATION_FORMAT,
                ..
            }
        ));
    }

    #[test]
    fn direct_layout_binds_only_the_viewport_uniforms() {
        let entries = binding_layout_entries(DisplayVariant::Direct);
        assert_eq!(entries.len(), 1);
        assert!(matches!(
            entries[0].ty,
            wgpu::BindingType::Buffer {
                min_binding_size: Some(size),
                ..
            } if size.get() == 8
        ));
    }
}
