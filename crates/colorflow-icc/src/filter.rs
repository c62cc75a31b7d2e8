//! The ICC transform filter.

use crate::{IccError, IccIdentity, Intent, StandardProfile};
use colorflow_core::{
    ColorSpaceTag, Connector, EngineError, EngineResult, OptionValue, Options, PixelLayout,
    ProfileIdentity, SampleType, Support,
};
use colorflow_graph::{Filter, RegionIo, SharedContext, StreamDesc};
use lcms2::{DisallowCache, Flags, GlobalContext, PixelFormat, Transform};
use std::sync::Arc;
use tracing::debug;

/// Registration of [`IccFilter`].
pub const ICC_LCMS2: &str = "//colour/icc.lcms2";

/// Destination profile: a profile value or a [`StandardProfile`] name.
pub const PROFILE_OUT: &str = "profile_out";
/// `perceptual`, `relative`, `saturation`, `absolute`, or `0` to `3`.
pub const RENDERING_INTENT: &str = "rendering_intent";
/// Boolean.
pub const BLACK_POINT_COMPENSATION: &str = "black_point_compensation";
/// Output sample type; defaults to the input's.
pub const SAMPLE_TYPE: &str = "sample_type";

/// Color channels handed to lcms2 per pixel; unused slots are padding.
const SLOTS: usize = 4;

type Pixel = [f32; SLOTS];

/// Converts color channels between the stream's profile and `profile_out`.
///
/// Extra channels are copied through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IccFilter;

/// Built context of [`IccFilter`].
///
/// The transform is built without the lcms2 pixel cache, which makes it
/// `Sync`: rows run in parallel over one shared transform.
pub struct IccTransform {
    transform: Transform<Pixel, Pixel, GlobalContext, DisallowCache>,
    input: Side,
    output: Side,
}

#[derive(Debug, Clone, Copy)]
struct Side {
    channels: usize,
    scale: f32,
}

impl Side {
    fn new(colorspace: ColorSpaceTag, channels: u8) -> Self {
        // lcms2 expects ink amounts in percent
        let scale = if colorspace == ColorSpaceTag::CMYK || colorspace == ColorSpaceTag::CMY {
            100.0
        } else {
            1.0
        };
        Self {
            channels: channels as usize,
            scale,
        }
    }
}

impl IccTransform {
    /// Transforms one row of logical-order samples.
    ///
    /// `src` holds `src_stride` values per pixel, `dst` `dst_stride`; the
    /// leading color channels are converted and up to `extra` trailing
    /// channels are copied.
    fn apply(
        &self,
        src: &[f32],
        src_stride: usize,
        dst: &mut [f32],
        dst_stride: usize,
        extra: usize,
    ) {
        let width = src.len() / src_stride.max(1);
        let input: Vec<Pixel> = src
            .chunks_exact(src_stride)
            .map(|px| {
                let mut p = [0.0; SLOTS];
                for (slot, v) in p.iter_mut().zip(&px[..self.input.channels]) {
                    *slot = v * self.input.scale;
                }
                p
            })
            .collect();
        let mut output = vec![[0.0; SLOTS]; width];
        self.transform.transform_pixels(&input, &mut output);

        let (n_in, n_out) = (self.input.channels, self.output.channels);
        for ((out, px), s) in output
            .iter()
            .zip(dst.chunks_exact_mut(dst_stride))
            .zip(src.chunks_exact(src_stride))
        {
            for (slot, v) in px[..n_out].iter_mut().zip(out) {
                *slot = v / self.output.scale;
            }
            px[n_out..n_out + extra].copy_from_slice(&s[n_in..n_in + extra]);
        }
    }
}

impl std::fmt::Debug for IccTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IccTransform")
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

fn supported(colorspace: ColorSpaceTag) -> bool {
    [
        ColorSpaceTag::GRAY,
        ColorSpaceTag::RGB,
        ColorSpaceTag::CMY,
        ColorSpaceTag::CMYK,
    ]
    .contains(&colorspace)
}

/// Resolves `profile_out`.
fn profile_out(options: &Options) -> EngineResult<Arc<dyn ProfileIdentity>> {
    match options.get(PROFILE_OUT) {
        Some(OptionValue::Profile(profile)) => Ok(profile.clone()),
        Some(OptionValue::Text(name)) => {
            let standard = StandardProfile::parse(name).ok_or_else(|| {
                EngineError::incompatible_option(PROFILE_OUT, format!("unknown profile `{name}`"))
            })?;
            Ok(IccIdentity::standard(standard)?.shared())
        }
        Some(_) => Err(EngineError::incompatible_option(PROFILE_OUT, "expected a profile")),
        None => Err(EngineError::incompatible_option(
            PROFILE_OUT,
            "a destination profile is required",
        )),
    }
}

fn intent(options: &Options) -> EngineResult<Intent> {
    match options.find_string(RENDERING_INTENT) {
        None if options.get(RENDERING_INTENT).is_some() => Err(EngineError::incompatible_option(
            RENDERING_INTENT,
            "expected text",
        )),
        None => Ok(Intent::default()),
        Some(text) => Intent::parse(text).ok_or_else(|| {
            EngineError::incompatible_option(RENDERING_INTENT, format!("unknown intent `{text}`"))
        }),
    }
}

fn open(profile: &Arc<dyn ProfileIdentity>, side: &str) -> EngineResult<crate::Profile> {
    let data = profile.icc_data().ok_or_else(|| {
        IccError::InvalidProfile(format!("{side} profile `{}` has no ICC data", profile.description()))
    })?;
    Ok(crate::Profile::from_icc(data)?)
}

/// lcms2 format for `channels` float color channels padded to [`SLOTS`].
fn lcms_format(colorspace: ColorSpaceTag, channels: u8) -> EngineResult<PixelFormat> {
    let layout = PixelLayout::new(colorspace, SampleType::F32, channels)?
        .with_extra(SLOTS as u8 - channels)?;
    Ok(PixelFormat(layout.encode()))
}

impl Filter for IccFilter {
    fn registration(&self) -> &str {
        ICC_LCMS2
    }

    fn description(&self) -> &str {
        "ICC profile conversion (lcms2)"
    }

    fn plugs(&self) -> Vec<Connector> {
        vec![
            Connector::image()
                .with_color_channels(1..=SLOTS as u8)
                .with_planar(Support::Never),
        ]
    }

    fn output_desc(&self, inputs: &[StreamDesc], options: &Options) -> EngineResult<StreamDesc> {
        let [input] = inputs else {
            return Err(EngineError::incompatible_data(format!(
                "expected one input stream, got {}",
                inputs.len()
            )));
        };
        let profile = profile_out(options)?;
        let colorspace = profile.colorspace();
        if !supported(colorspace) {
            return Err(IccError::UnsupportedColorSpace(profile.description()).into());
        }
        let sample = match options.find_string(SAMPLE_TYPE) {
            None => input.layout.sample(),
            Some(name) => SampleType::parse(name).ok_or_else(|| {
                EngineError::incompatible_option(SAMPLE_TYPE, format!("unknown sample type `{name}`"))
            })?,
        };
        let layout = PixelLayout::new(colorspace, sample, profile.channel_count())?
            .with_extra(input.layout.extra_channels())?
            .with_premultiplied(input.layout.is_premultiplied());
        Ok(StreamDesc::new(layout, input.width, input.height).with_profile(Some(profile)))
    }

    fn needs_context(&self) -> bool {
        true
    }

    fn affects_context(&self, key: &str) -> bool {
        // the output layout covers sample_type
        matches!(key, PROFILE_OUT | RENDERING_INTENT | BLACK_POINT_COMPENSATION)
    }

    fn build_context(
        &self,
        inputs: &[StreamDesc],
        output: &StreamDesc,
        options: &Options,
    ) -> EngineResult<SharedContext> {
        let input = inputs
            .first()
            .ok_or_else(|| EngineError::incompatible_data("missing input stream"))?;
        let source = input.profile.as_ref().ok_or_else(|| {
            EngineError::incompatible_context("input stream carries no profile")
        })?;
        let destination = output.profile.clone().map_or_else(|| profile_out(options), Ok)?;
        if !supported(source.colorspace()) {
            return Err(IccError::UnsupportedColorSpace(source.description()).into());
        }
        let in_channels = input.layout.color_channels();
        if source.channel_count() != in_channels {
            return Err(EngineError::incompatible_context(format!(
                "input profile has {} channels, stream has {in_channels}",
                source.channel_count()
            )));
        }

        let intent = intent(options)?;
        let bpc = options.get_bool(BLACK_POINT_COMPENSATION)?.unwrap_or(false);
        let in_format = lcms_format(source.colorspace(), in_channels)?;
        let out_channels = output.layout.color_channels();
        let out_format = lcms_format(destination.colorspace(), out_channels)?;

        let src_profile = open(source, "input")?;
        let dst_profile = open(&destination, "output")?;
        let flags = if bpc {
            Flags::NO_CACHE | Flags::BLACKPOINT_COMPENSATION
        } else {
            Flags::NO_CACHE
        };
        let transform = Transform::new_flags_context(
            GlobalContext::new(),
            &src_profile.inner,
            in_format,
            &dst_profile.inner,
            out_format,
            intent.into(),
            flags,
        )
        .map_err(|e| IccError::TransformFailed(e.to_string()))?;

        debug!(
            from = %source.description(),
            to = %destination.description(),
            ?intent,
            bpc,
            "icc transform built"
        );
        Ok(Arc::new(IccTransform {
            transform,
            input: Side::new(source.colorspace(), in_channels),
            output: Side::new(destination.colorspace(), out_channels),
        }))
    }

    fn execute(
        &self,
        context: Option<&SharedContext>,
        _options: &Options,
        io: &mut RegionIo<'_>,
    ) -> EngineResult<()> {
        let transform = context
            .and_then(|c| c.downcast_ref::<IccTransform>())
            .ok_or_else(|| EngineError::not_found("icc transform"))?;
        let src_stride = io.input_layout(0)?.channels() as usize;
        let output = io.output_layout();
        let dst_stride = output.channels() as usize;
        let extra = output.extra_channels() as usize;
        io.map_pixels(|src, dst| {
            transform.apply(src, src_stride, dst, dst_stride, extra);
            Ok(())
        })
    }
}
