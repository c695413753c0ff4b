pub const CLASSIFIER_MODEL_NAME: &str = "googlenet-3.onnx";
pub const CLASSIFIER_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/classification/inception_and_googlenet/googlenet/model/googlenet-3.onnx";

pub const LABELS_FILE_NAME: &str = "imagenet-simple-labels.json";
pub const LABELS_URL: &str =
    "https://raw.githubusercontent.com/anishathalye/imagenet-simple-labels/master/imagenet-simple-labels.json";

/// Directory next to the executable that holds bundled model assets.
pub const RESOURCES_DIR_NAME: &str = "Resources";

/// Sample every Nth frame.
pub const DEFAULT_STRIDE: usize = 30;

/// Classifier input resolution (square).
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Labels kept per classified frame.
pub const DEFAULT_TOP_K: usize = 5;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: u64 = 500_000_000;

/// Per-channel means subtracted in BGR order. Part of the model's input
/// contract; do not tune.
pub const BGR_MEAN: [f32; 3] = [103.939, 116.779, 123.68];

pub const SCRATCH_DIR_PREFIX: &str = "framesift-run-";
pub const UPLOAD_FILE_PREFIX: &str = "framesift-upload-";
