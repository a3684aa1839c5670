use epaper_stream::display::{
    DeviceProfile, DisplayEngine, Opcodes, PanelFamily, PixelPacker, ProfileSpec, RecordingTransport,
};
use epaper_stream::image_proc::dither::diffusion_shares;
use epaper_stream::image_proc::{BgrImage, ByteColor, ColorMatcher, DitherMode, FloydSteinberg};
use proptest::prelude::*;

fn color() -> impl Strategy<Value = ByteColor> {
    (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b)| ByteColor::new(r, g, b))
}

/// 32x16 four-color panel, small enough to run many cases.
fn small_profile() -> DeviceProfile {
    DeviceProfile::new(ProfileSpec {
        name: "small",
        family: PanelFamily::MultiColor,
        width: 32,
        height: 16,
        pixels_per_byte: 2,
        palette: vec![ByteColor::BLACK, ByteColor::WHITE, ByteColor::RED, ByteColor::BLUE],
        device_codes: vec![0x0, 0x1, 0x4, 0x5],
        opcodes: Opcodes {
            get_status: 0x71,
            start_transmission: 0x10,
            start_transmission_2: None,
            stop_transmission: None,
            power_on: 0x04,
            power_off: 0x02,
            deep_sleep: 0x07,
        },
        init_script: Vec::new(),
        refresh_script: Vec::new(),
        dither_mode: DitherMode::FloydSteinberg,
    })
    .unwrap()
}

proptest! {
    #[test]
    fn nibble_merge_round_trips(indices in prop::collection::vec(0usize..16, 2)) {
        let codes: Vec<u8> = (0..16).collect();
        let packer = PixelPacker::new(2, &codes).unwrap();
        let byte = packer.merge(&indices).unwrap();
        prop_assert_eq!((byte >> 4) as usize, indices[0]);
        prop_assert_eq!((byte & 0x0F) as usize, indices[1]);
    }

    #[test]
    fn bit_merge_round_trips(indices in prop::collection::vec(0usize..2, 8)) {
        let packer = PixelPacker::new(8, &[0, 1]).unwrap();
        let byte = packer.merge(&indices).unwrap();
        for (i, &index) in indices.iter().enumerate() {
            prop_assert_eq!(((byte >> (7 - i)) & 1) as usize, index);
        }
    }

    #[test]
    fn first_palette_entry_maps_to_index_zero(palette in prop::collection::vec(color(), 1..8)) {
        let matcher = ColorMatcher::new(&palette);
        prop_assert_eq!(matcher.color_index(palette[0]), 0);
    }

    #[test]
    fn gray_palettes_map_their_first_entry_to_zero(levels in prop::collection::vec(any::<u8>(), 1..8)) {
        let palette: Vec<ByteColor> = levels.into_iter().map(ByteColor::gray).collect();
        let matcher = ColorMatcher::new(&palette);
        prop_assert!(matcher.is_monochrome());
        prop_assert_eq!(matcher.color_index(palette[0]), 0);
    }

    #[test]
    fn diffusion_shares_conserve_the_error(error in -255i32..=255) {
        let shares = diffusion_shares(error);
        let total: i32 = shares.iter().sum();
        // Each of the four shares truncates toward zero.
        prop_assert!((error - total).abs() <= 3);
        prop_assert!(total.abs() <= error.abs());
        prop_assert!(shares.iter().all(|s| s.signum() * error.signum() >= 0));
    }

    #[test]
    fn ditherer_emits_full_rows(
        width in 1u32..40,
        height in 1u32..24,
        fill in color(),
    ) {
        let matcher = ColorMatcher::new(&[ByteColor::BLACK, ByteColor::WHITE, ByteColor::RED]);
        let image = BgrImage::filled(width, height, fill);
        let mut out = Vec::new();
        let rows = FloydSteinberg::new(&matcher, 32, 16).run(&image.view(), &mut out).unwrap();
        prop_assert_eq!(rows, height.min(16));
        prop_assert_eq!(out.len(), 32 * rows as usize);
        prop_assert!(out.iter().all(|&i| i < 3));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn frames_are_always_full_size(
        width in 1u32..48,
        height in 1u32..24,
        fill in color(),
        dither in any::<bool>(),
    ) {
        let rec = RecordingTransport::new();
        let mut engine = DisplayEngine::new(small_profile());
        engine.initialize(rec.clone()).unwrap();
        rec.clear();

        let image = BgrImage::filled(width, height, fill);
        engine.display_image(&image.view(), dither).unwrap();

        let wire = rec.wire_bytes();
        prop_assert_eq!(wire[0], 0x10);
        prop_assert_eq!(wire.len(), 1 + 16 * 16);

        // Rows below the image are always white; columns to the right are
        // white unless error diffusion reached them.
        let data = &wire[1..];
        for y in 0..16u32 {
            for x in 0..32u32 {
                let byte = data[(y * 16 + x / 2) as usize];
                let code = if x % 2 == 0 { byte >> 4 } else { byte & 0x0F };
                if y >= height || (x >= width && !dither) {
                    prop_assert_eq!(code, 0x1, "pixel {},{}", x, y);
                }
            }
        }
    }
}
