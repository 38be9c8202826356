//! Render pipelines.
//!
//! Everything that can be derived from the descriptor is derived once, at creation:
//! the vertex stride and attribute locations, uniform locations and block bindings,
//! sampler unit assignments, and the native enums of the blend and depth/stencil
//! state. Activation only replays cached values through the state cache.

use std::sync::Arc;

use smallvec::SmallVec;

use super::{Device, DeviceContext, LifecycleState, NativeObject, ResourceBase, ShaderModule, next_resource_id};
use crate::errors::{GpuError, Result};
use crate::gl::consts::{
    GLenum, GLint, GLuint, GL_BACK, GL_BLEND, GL_DEPTH_TEST, GL_FALSE, GL_FRONT, GL_INVALID_INDEX, GL_LINK_STATUS,
    GL_STENCIL_TEST,
};
use crate::gl::{GlInterface, StateCache, convert};
use crate::gpu::{
    BlendFormula, ColorWriteMask, DepthStencilState, PixelFormat, SamplerBinding, ShaderStage, StencilFaceState,
    UniformBlockLayout, UniformFormat, VertexAttribute, VertexLayout,
};

/// The single color attachment a pipeline renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTarget {
    pub format: PixelFormat,
    pub blend: BlendFormula,
    pub write_mask: ColorWriteMask,
}

impl ColorTarget {
    /// Source-over blending, all channels written.
    #[must_use]
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            blend: BlendFormula::SRC_OVER,
            write_mask: ColorWriteMask::ALL,
        }
    }

    #[must_use]
    pub fn with_blend(mut self, blend: BlendFormula) -> Self {
        self.blend = blend;
        self
    }

    #[must_use]
    pub fn with_write_mask(mut self, write_mask: ColorWriteMask) -> Self {
        self.write_mask = write_mask;
        self
    }
}

/// Describes a render pipeline.
#[derive(Debug, Clone, Copy)]
pub struct RenderPipelineDescriptor<'a> {
    pub vertex: &'a ShaderModule,
    pub fragment: &'a ShaderModule,
    /// Interleaved attributes of vertex buffer 0, in shader-input order.
    pub vertex_attributes: &'a [VertexAttribute],
    pub uniform_blocks: &'a [UniformBlockLayout],
    pub samplers: &'a [SamplerBinding],
    pub color_target: ColorTarget,
    pub depth_stencil: Option<DepthStencilState>,
    /// The fragment shader reads the framebuffer; drivers exposing a per-sample fetch
    /// toggle get it enabled while this pipeline is active.
    pub framebuffer_fetch: bool,
}

impl<'a> RenderPipelineDescriptor<'a> {
    #[must_use]
    pub fn new(vertex: &'a ShaderModule, fragment: &'a ShaderModule, color_target: ColorTarget) -> Self {
        Self {
            vertex,
            fragment,
            vertex_attributes: &[],
            uniform_blocks: &[],
            samplers: &[],
            color_target,
            depth_stencil: None,
            framebuffer_fetch: false,
        }
    }

    #[must_use]
    pub fn with_vertex_attributes(mut self, attributes: &'a [VertexAttribute]) -> Self {
        self.vertex_attributes = attributes;
        self
    }

    #[must_use]
    pub fn with_uniform_blocks(mut self, blocks: &'a [UniformBlockLayout]) -> Self {
        self.uniform_blocks = blocks;
        self
    }

    #[must_use]
    pub fn with_samplers(mut self, samplers: &'a [SamplerBinding]) -> Self {
        self.samplers = samplers;
        self
    }

    #[must_use]
    pub fn with_depth_stencil(mut self, state: DepthStencilState) -> Self {
        self.depth_stencil = Some(state);
        self
    }

    #[must_use]
    pub fn with_framebuffer_fetch(mut self, enabled: bool) -> Self {
        self.framebuffer_fetch = enabled;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NativeBlend {
    enabled: bool,
    factors: [GLenum; 4],
    equations: [GLenum; 2],
}

impl NativeBlend {
    fn new(formula: &BlendFormula) -> Self {
        Self {
            enabled: !formula.is_identity(),
            factors: [
                convert::blend_factor(formula.color.src_factor),
                convert::blend_factor(formula.color.dst_factor),
                convert::blend_factor(formula.alpha.src_factor),
                convert::blend_factor(formula.alpha.dst_factor),
            ],
            equations: [
                convert::blend_equation(formula.color.operation),
                convert::blend_equation(formula.alpha.operation),
            ],
        }
    }
}

/// `[func, fail, depth_fail, pass]`
type NativeStencilFace = [GLenum; 4];

fn stencil_face(face: &StencilFaceState) -> NativeStencilFace {
    [
        convert::compare_function(face.compare),
        convert::stencil_operation(face.fail_op),
        convert::stencil_operation(face.depth_fail_op),
        convert::stencil_operation(face.pass_op),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NativeDepthStencil {
    depth_test: bool,
    depth_func: GLenum,
    depth_write: bool,
    stencil_test: bool,
    front: NativeStencilFace,
    back: NativeStencilFace,
    read_mask: GLuint,
    write_mask: GLuint,
}

impl NativeDepthStencil {
    fn new(state: &DepthStencilState) -> Self {
        Self {
            depth_test: state.depth_test_enabled(),
            depth_func: convert::compare_function(state.depth_compare),
            depth_write: state.depth_write_enabled,
            stencil_test: state.stencil_test_enabled(),
            front: stencil_face(&state.stencil_front),
            back: stencil_face(&state.stencil_back),
            read_mask: state.stencil_read_mask,
            write_mask: state.stencil_write_mask,
        }
    }
}

/// A block member uploaded with a per-uniform call when uniform blocks are shadowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShadowUniform {
    binding: u32,
    format: UniformFormat,
    offset: usize,
    location: GLint,
}

/// A linked program plus the fixed-function state it renders with.
#[derive(Debug)]
pub struct RenderPipeline {
    base: ResourceBase,
    program: GLuint,
    layout: VertexLayout,
    uniform_bindings: SmallVec<[u32; 4]>,
    /// Empty when uniform blocks are native.
    shadow_uniforms: Vec<ShadowUniform>,
    uses_uniform_blocks: bool,
    sampler_units: SmallVec<[u32; 4]>,
    color_format: PixelFormat,
    blend: NativeBlend,
    write_mask: ColorWriteMask,
    depth_stencil: Option<NativeDepthStencil>,
    framebuffer_fetch: bool,
}

impl RenderPipeline {
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.base.id()
    }

    #[inline]
    #[must_use]
    pub fn native_id(&self) -> GLuint {
        self.program
    }

    /// Bytes between consecutive vertices of buffer 0.
    #[inline]
    #[must_use]
    pub fn vertex_stride(&self) -> usize {
        self.layout.stride()
    }

    #[inline]
    #[must_use]
    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.layout
    }

    #[inline]
    #[must_use]
    pub fn color_format(&self) -> PixelFormat {
        self.color_format
    }

    /// Whether uniform buffers are bound as native uniform blocks (`false` when they are
    /// uploaded from CPU shadows).
    #[inline]
    #[must_use]
    pub fn uses_uniform_blocks(&self) -> bool {
        self.uses_uniform_blocks
    }

    /// Whether activation enables blending. The identity formula leaves it disabled.
    #[inline]
    #[must_use]
    pub fn blend_enabled(&self) -> bool {
        self.blend.enabled
    }

    #[inline]
    #[must_use]
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.base.state()
    }

    pub(crate) fn check(&self, context: &DeviceContext) -> Result<()> {
        self.base.check(context.id)
    }

    pub(crate) fn uniform_bindings(&self) -> &[u32] {
        &self.uniform_bindings
    }

    pub(crate) fn sampler_units(&self) -> &[u32] {
        &self.sampler_units
    }

    /// Binds the program and replays the fixed-function state.
    pub(crate) fn activate(&self, state: &mut StateCache, fetch_flag: Option<GLenum>, stencil_reference: u32) {
        state.use_program(self.id(), self.program);

        if let Some(flag) = fetch_flag {
            state.set_capability(flag, self.framebuffer_fetch);
        }

        // The identity formula is cheaper with blending off.
        state.set_capability(GL_BLEND, self.blend.enabled);
        if self.blend.enabled {
            let [src_rgb, dst_rgb, src_alpha, dst_alpha] = self.blend.factors;
            state.blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha);
            state.blend_equation_separate(self.blend.equations[0], self.blend.equations[1]);
        }

        let mask = self.write_mask;
        state.color_mask(
            mask.contains(ColorWriteMask::RED),
            mask.contains(ColorWriteMask::GREEN),
            mask.contains(ColorWriteMask::BLUE),
            mask.contains(ColorWriteMask::ALPHA),
        );

        match &self.depth_stencil {
            Some(ds) => {
                state.set_capability(GL_DEPTH_TEST, ds.depth_test);
                if ds.depth_test {
                    state.depth_func(ds.depth_func);
                }
                state.depth_mask(ds.depth_write);

                state.set_capability(GL_STENCIL_TEST, ds.stencil_test);
                if ds.stencil_test {
                    let reference = stencil_reference as GLint;
                    for (face, [func, fail, depth_fail, pass]) in [(GL_FRONT, ds.front), (GL_BACK, ds.back)] {
                        state.stencil_func_separate(face, func, reference, ds.read_mask);
                        state.stencil_op_separate(face, fail, depth_fail, pass);
                    }
                    state.stencil_mask(ds.write_mask);
                }
            }
            None => {
                state.set_capability(GL_DEPTH_TEST, false);
                state.set_capability(GL_STENCIL_TEST, false);
            }
        }
    }

    /// Uploads the members fed from uniform binding `binding` out of a CPU shadow.
    /// The program must be current.
    pub(crate) fn upload_shadow_uniforms(&self, gl: &dyn GlInterface, binding: u32, bytes: &[u8]) {
        for uniform in self.shadow_uniforms.iter().filter(|uniform| uniform.binding == binding) {
            let Some(raw) = bytes.get(uniform.offset..uniform.offset + uniform.format.size()) else {
                log::warn!("Uniform at offset {} lies outside its {} byte buffer", uniform.offset, bytes.len());
                continue;
            };
            let location = uniform.location;
            match uniform.format {
                UniformFormat::Float => gl.uniform_1fv(location, &floats(raw)),
                UniformFormat::Float2 => gl.uniform_2fv(location, &floats(raw)),
                UniformFormat::Float3 => gl.uniform_3fv(location, &floats(raw)),
                UniformFormat::Float4 => gl.uniform_4fv(location, &floats(raw)),
                UniformFormat::Float2x2 => gl.uniform_matrix_2fv(location, &floats(raw)),
                UniformFormat::Float3x3 => {
                    // Drop the padding lane of each column.
                    let padded = floats(raw);
                    let packed: SmallVec<[f32; 9]> =
                        padded.chunks_exact(4).flat_map(|column| column[..3].iter().copied()).collect();
                    gl.uniform_matrix_3fv(location, &packed);
                }
                UniformFormat::Float4x4 => gl.uniform_matrix_4fv(location, &floats(raw)),
                UniformFormat::Int => gl.uniform_1iv(location, &ints(raw)),
                UniformFormat::Int2 => gl.uniform_2iv(location, &ints(raw)),
                UniformFormat::Int3 => gl.uniform_3iv(location, &ints(raw)),
                UniformFormat::Int4 => gl.uniform_4iv(location, &ints(raw)),
            }
        }
    }
}

fn floats(raw: &[u8]) -> Vec<f32> {
    bytemuck::pod_collect_to_vec(raw)
}

fn ints(raw: &[u8]) -> Vec<i32> {
    bytemuck::pod_collect_to_vec(raw)
}

impl Device {
    /// Links a vertex and a fragment module into a pipeline. On failure the driver's
    /// info log is returned in [`GpuError::ProgramLink`] and no program survives.
    pub fn create_render_pipeline(&self, descriptor: &RenderPipelineDescriptor<'_>) -> Result<Arc<RenderPipeline>> {
        let context = self.context.as_ref();
        validate(descriptor, context)
            .inspect_err(|e| log::warn!("[{}] Rejected render pipeline: {e}", context.settings.label))?;

        let gl = context.gl();
        let layout = VertexLayout::new(descriptor.vertex_attributes);
        let program = gl.create_program();
        if program == 0 {
            log::error!("[{}] glCreateProgram returned no program", context.settings.label);
            return Err(GpuError::AllocationFailed("program"));
        }

        let (vertex, fragment) = (descriptor.vertex.native_id(), descriptor.fragment.native_id());
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        for attribute in layout.attributes() {
            gl.bind_attrib_location(program, attribute.location, &attribute.name);
        }
        gl.link_program(program);
        gl.detach_shader(program, vertex);
        gl.detach_shader(program, fragment);

        if gl.get_program_parameter(program, GL_LINK_STATUS) == GLint::from(GL_FALSE) {
            let info_log = gl.get_program_info_log(program);
            log::error!("[{}] Program failed to link: {}", context.settings.label, info_log.trim_end());
            gl.delete_program(program);
            return Err(GpuError::ProgramLink(info_log));
        }

        let identity = next_resource_id();
        let uses_uniform_blocks = context.caps().uniform_buffer_support && !context.settings.force_shadow_uniforms;

        // Sampler units never change, so they are assigned once.
        context.state.borrow_mut().use_program(identity, program);
        for sampler in descriptor.samplers {
            match gl.get_uniform_location(program, &sampler.name) {
                -1 => log::debug!("[{}] Sampler '{}' is not active", context.settings.label, sampler.name),
                location => gl.uniform_1i(location, sampler.binding as GLint),
            }
        }

        let mut shadow_uniforms = Vec::new();
        for block in descriptor.uniform_blocks {
            if uses_uniform_blocks {
                match gl.get_uniform_block_index(program, &block.name) {
                    GL_INVALID_INDEX => {
                        log::debug!("[{}] Uniform block '{}' is not active", context.settings.label, block.name);
                    }
                    index => gl.uniform_block_binding(program, index, block.binding),
                }
            } else {
                for field in &block.fields {
                    match gl.get_uniform_location(program, &field.name) {
                        -1 => log::debug!("[{}] Uniform '{}' is not active", context.settings.label, field.name),
                        location => shadow_uniforms.push(ShadowUniform {
                            binding: block.binding,
                            format: field.format,
                            offset: field.offset,
                            location,
                        }),
                    }
                }
            }
        }

        let base = context.attach(identity, NativeObject::Program(program));
        log::debug!(
            "[{}] Linked pipeline #{identity}: stride {}, {} uniform blocks ({}), {} samplers",
            context.settings.label,
            layout.stride(),
            descriptor.uniform_blocks.len(),
            if uses_uniform_blocks { "native" } else { "shadowed" },
            descriptor.samplers.len()
        );

        Ok(Arc::new(RenderPipeline {
            base,
            program,
            uniform_bindings: descriptor.uniform_blocks.iter().map(|block| block.binding).collect(),
            shadow_uniforms,
            uses_uniform_blocks,
            sampler_units: descriptor.samplers.iter().map(|sampler| sampler.binding).collect(),
            color_format: descriptor.color_target.format,
            blend: NativeBlend::new(&descriptor.color_target.blend),
            write_mask: descriptor.color_target.write_mask,
            depth_stencil: descriptor.depth_stencil.as_ref().map(NativeDepthStencil::new),
            framebuffer_fetch: descriptor.framebuffer_fetch,
            layout,
        }))
    }
}

fn validate(descriptor: &RenderPipelineDescriptor<'_>, context: &DeviceContext) -> Result<()> {
    descriptor.vertex.check(context)?;
    descriptor.fragment.check(context)?;
    if descriptor.vertex.stage() != ShaderStage::Vertex || descriptor.fragment.stage() != ShaderStage::Fragment {
        return Err(GpuError::InvalidArgument(String::from(
            "pipeline needs a vertex module and a fragment module",
        )));
    }
    let max_attributes = context.caps().max_vertex_attributes as usize;
    if descriptor.vertex_attributes.len() > max_attributes.min(32) {
        return Err(GpuError::InvalidArgument(format!(
            "{} vertex attributes exceed the device limit of {max_attributes}",
            descriptor.vertex_attributes.len()
        )));
    }
    // The last unit is reserved for uploads and copies.
    let sampler_units = context.state.borrow().texture_unit_count().saturating_sub(1) as u32;
    if let Some(sampler) = descriptor.samplers.iter().find(|sampler| sampler.binding >= sampler_units) {
        return Err(GpuError::InvalidArgument(format!(
            "sampler '{}' uses unit {} but only {sampler_units} units are available",
            sampler.name, sampler.binding
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{BlendFactor, BlendOperation};

    #[test]
    fn identity_formula_disables_blending() {
        assert!(!NativeBlend::new(&BlendFormula::REPLACE).enabled);
        let additive = BlendFormula::uniform(BlendFactor::One, BlendFactor::One, BlendOperation::Add);
        let native = NativeBlend::new(&additive);
        assert!(native.enabled);
        assert_eq!(native.factors, [crate::gl::consts::GL_ONE; 4]);
    }
}
