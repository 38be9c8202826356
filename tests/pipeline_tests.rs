//! Shader & Pipeline Tests
//!
//! Tests for:
//! - Shader compilation: info logs on failure, nothing left behind
//! - Pipeline creation: stage checks, sampler units, allocation failures
//! - Fixed-function state replayed on activation (blend, depth, stencil)

use std::sync::Arc;

use vellum::gl::consts::{GL_BLEND, GL_DEPTH_TEST, GL_STENCIL_TEST};
use vellum::gpu::{
    BlendFormula, CompareFunction, DepthStencilState, PixelFormat, PrimitiveType, SamplerBinding,
    ShaderModuleDescriptor, ShaderStage, StencilFaceState, StencilOperation, TextureDescriptor, TextureUsage,
};
use vellum::{
    ColorTarget, DepthStencilAttachment, Device, DeviceSettings, GpuError, HeadlessGl, RenderPassDescriptor,
    RenderPipelineDescriptor, ShaderModule,
};

fn setup(gl: HeadlessGl) -> (Arc<HeadlessGl>, Device) {
    setup_with(gl, DeviceSettings::default())
}

fn setup_with(gl: HeadlessGl, settings: DeviceSettings) -> (Arc<HeadlessGl>, Device) {
    let _ = env_logger::builder().is_test(true).try_init();
    let gl = Arc::new(gl);
    let device = Device::from_gl(gl.clone(), settings.with_label("pipelines")).unwrap();
    (gl, device)
}

fn modules(device: &Device) -> (Arc<ShaderModule>, Arc<ShaderModule>) {
    let vertex = device
        .create_shader_module(&ShaderModuleDescriptor::new("void main() {}", ShaderStage::Vertex))
        .unwrap();
    let fragment = device
        .create_shader_module(&ShaderModuleDescriptor::new(
            "uniform sampler2D u_image;\nvoid main() {}",
            ShaderStage::Fragment,
        ))
        .unwrap();
    (vertex, fragment)
}

// ============================================================================
// Shader Modules
// ============================================================================

#[test]
fn compile_errors_carry_the_info_log() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let source = "#error missing precision qualifier\nvoid main() {}";

    match device.create_shader_module(&ShaderModuleDescriptor::new(source, ShaderStage::Fragment)) {
        Err(GpuError::ShaderCompile(log)) => assert!(log.contains("missing precision qualifier"), "{log}"),
        other => panic!("expected a compile error, got {other:?}"),
    }
    assert_eq!(gl.live_shaders(), 0);
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn empty_source_is_rejected_without_native_calls() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    gl.reset_counters();
    let result = device.create_shader_module(&ShaderModuleDescriptor::new("  \n", ShaderStage::Vertex));
    assert!(matches!(result, Err(GpuError::InvalidArgument(_))));
    assert_eq!(gl.total_calls(), 0);
}

#[test]
fn compiled_module_reports_its_stage() {
    let (gl, device) = setup(HeadlessGl::gles(2));
    let (vertex, fragment) = modules(&device);
    assert_eq!(vertex.stage(), ShaderStage::Vertex);
    assert_eq!(fragment.stage(), ShaderStage::Fragment);
    assert_eq!(gl.live_shaders(), 2);
}

// ============================================================================
// Pipelines
// ============================================================================

#[test]
fn pipeline_outlives_its_modules() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let (vertex, fragment) = modules(&device);
    let pipeline = device
        .create_render_pipeline(&RenderPipelineDescriptor::new(
            &vertex,
            &fragment,
            ColorTarget::new(PixelFormat::Rgba8888),
        ))
        .unwrap();

    drop((vertex, fragment));
    drop(device.create_command_encoder());
    assert_eq!(gl.live_shaders(), 0);
    assert_eq!(gl.live_programs(), 1);
    assert_ne!(pipeline.native_id(), 0);
}

#[test]
fn stages_must_match_their_slots() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let (vertex, fragment) = modules(&device);
    gl.reset_counters();

    let result = device.create_render_pipeline(&RenderPipelineDescriptor::new(
        &fragment,
        &vertex,
        ColorTarget::new(PixelFormat::Rgba8888),
    ));
    assert!(matches!(result, Err(GpuError::InvalidArgument(_))));
    assert_eq!(gl.total_calls(), 0);
}

#[test]
fn sampler_units_exclude_the_reserved_unit() {
    let (gl, device) = setup_with(HeadlessGl::gles(3), DeviceSettings::default().with_max_texture_units(4));
    let (vertex, fragment) = modules(&device);
    let target = ColorTarget::new(PixelFormat::Rgba8888);

    let last_usable = [SamplerBinding::new("u_image", 2)];
    let pipeline = device
        .create_render_pipeline(&RenderPipelineDescriptor::new(&vertex, &fragment, target).with_samplers(&last_usable))
        .unwrap();
    assert_eq!(
        gl.uniform_value(pipeline.native_id(), "u_image"),
        Some(vellum::gl::UniformValue::Int(vec![2]))
    );

    let reserved = [SamplerBinding::new("u_image", 3)];
    let result =
        device.create_render_pipeline(&RenderPipelineDescriptor::new(&vertex, &fragment, target).with_samplers(&reserved));
    assert!(matches!(result, Err(GpuError::InvalidArgument(_))));
}

#[test]
fn program_allocation_failure() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let (vertex, fragment) = modules(&device);
    gl.set_fail_allocations(true);

    let result = device.create_render_pipeline(&RenderPipelineDescriptor::new(
        &vertex,
        &fragment,
        ColorTarget::new(PixelFormat::Rgba8888),
    ));
    assert_eq!(result.err(), Some(GpuError::AllocationFailed("program")));
    assert_eq!(gl.live_programs(), 0);
}

#[test]
fn uniform_strategy_follows_the_device() {
    let target = ColorTarget::new(PixelFormat::Rgba8888);

    let (_gl, device) = setup(HeadlessGl::gles(3));
    let (vertex, fragment) = modules(&device);
    let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor::new(&vertex, &fragment, target)).unwrap();
    assert!(pipeline.uses_uniform_blocks());

    let (_gl, device) = setup_with(HeadlessGl::gles(3), DeviceSettings::default().with_force_shadow_uniforms(true));
    let (vertex, fragment) = modules(&device);
    let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor::new(&vertex, &fragment, target)).unwrap();
    assert!(!pipeline.uses_uniform_blocks());
}

// ============================================================================
// Fixed-Function State
// ============================================================================

#[test]
fn blend_and_depth_stencil_state_are_applied_on_draw() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let color = device
        .create_texture(
            &TextureDescriptor::new_2d(8, 8, PixelFormat::Rgba8888)
                .with_usage(TextureUsage::TEXTURE_BINDING | TextureUsage::RENDER_ATTACHMENT),
        )
        .unwrap();
    let depth = device
        .create_texture(
            &TextureDescriptor::new_2d(8, 8, PixelFormat::Depth24Stencil8).with_usage(TextureUsage::RENDER_ATTACHMENT),
        )
        .unwrap();
    let (vertex, fragment) = modules(&device);

    let stencil = StencilFaceState {
        compare: CompareFunction::Equal,
        pass_op: StencilOperation::IncrementClamp,
        ..StencilFaceState::default()
    };
    let masked = device
        .create_render_pipeline(
            &RenderPipelineDescriptor::new(&vertex, &fragment, ColorTarget::new(PixelFormat::Rgba8888)).with_depth_stencil(
                DepthStencilState {
                    depth_compare: CompareFunction::Less,
                    depth_write_enabled: true,
                    stencil_front: stencil,
                    stencil_back: stencil,
                    ..DepthStencilState::default()
                },
            ),
        )
        .unwrap();
    let opaque = device
        .create_render_pipeline(&RenderPipelineDescriptor::new(
            &vertex,
            &fragment,
            ColorTarget::new(PixelFormat::Rgba8888).with_blend(BlendFormula::REPLACE),
        ))
        .unwrap();
    assert!(masked.blend_enabled());
    assert!(!opaque.blend_enabled());

    let mut encoder = device.create_command_encoder();
    let mut pass = encoder
        .begin_render_pass(
            &RenderPassDescriptor::new(&color)
                .with_depth_stencil(DepthStencilAttachment::new(&depth).with_depth_clear(1.0).with_stencil_clear(0)),
        )
        .unwrap();

    pass.set_pipeline(&masked).unwrap();
    pass.set_stencil_reference(1);
    pass.draw(PrimitiveType::Triangles, 0, 3).unwrap();
    assert!(gl.is_enabled(GL_BLEND));
    assert!(gl.is_enabled(GL_DEPTH_TEST));
    assert!(gl.is_enabled(GL_STENCIL_TEST));

    pass.set_pipeline(&opaque).unwrap();
    pass.draw(PrimitiveType::Triangles, 0, 3).unwrap();
    assert!(!gl.is_enabled(GL_BLEND));
    assert!(!gl.is_enabled(GL_DEPTH_TEST));
    assert!(!gl.is_enabled(GL_STENCIL_TEST));
    pass.end().unwrap();
}

#[test]
fn depth_stencil_attachment_must_match_the_target() {
    let (_gl, device) = setup(HeadlessGl::gles(3));
    let color = device
        .create_texture(
            &TextureDescriptor::new_2d(8, 8, PixelFormat::Rgba8888)
                .with_usage(TextureUsage::TEXTURE_BINDING | TextureUsage::RENDER_ATTACHMENT),
        )
        .unwrap();
    let depth = device
        .create_texture(
            &TextureDescriptor::new_2d(4, 4, PixelFormat::Depth24Stencil8).with_usage(TextureUsage::RENDER_ATTACHMENT),
        )
        .unwrap();

    let mut encoder = device.create_command_encoder();
    assert!(matches!(
        encoder.begin_render_pass(&RenderPassDescriptor::new(&color).with_depth_stencil(DepthStencilAttachment::new(&depth))),
        Err(GpuError::InvalidArgument(_))
    ));
    // A color texture is not a depth-stencil attachment.
    assert!(matches!(
        encoder.begin_render_pass(&RenderPassDescriptor::new(&color).with_depth_stencil(DepthStencilAttachment::new(&color))),
        Err(GpuError::InvalidArgument(_))
    ));
}
