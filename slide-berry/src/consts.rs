//! 通用常量.
//!
//! 这些值在核心流程中是固定的, 不在运行时调整.

/// 切块边长, 以原图像素为单位.
pub const TILE_SIZE: u32 = 256;

/// 单个切块的像素个数.
pub const TILE_AREA: u32 = TILE_SIZE * TILE_SIZE;

/// 切块组织占比门限. 组织占比 **严格大于** 该值的切块才会被接受.
pub const TISSUE_THRESHOLD: f64 = 0.5;

/// 缩略图的最大尺寸 (宽, 高). 缩略图保持原图长宽比.
pub const THUMBNAIL_MAX: (u32, u32) = (1024, 1024);

/// 组织掩膜闭运算所用正方形结构元的边长.
pub const CLOSING_SIZE: u8 = 5;

/// 分类模型的输入边长.
pub const MODEL_INPUT_SIZE: u32 = 224;

/// 切块持久化时的文件扩展名.
pub const TILE_EXT: &str = "jpg";

/// 切块文件名前缀.
pub const TILE_PREFIX: &str = "tile_";

/// 标注颜色.
pub mod color {
    use image::Rgb;

    /// 红色.
    pub const RED: Rgb<u8> = Rgb([255, 0, 0]);

    /// 蓝色.
    pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    /// 紫色.
    pub const PURPLE: Rgb<u8> = Rgb([128, 0, 128]);

    /// 绿色.
    pub const GREEN: Rgb<u8> = Rgb([0, 128, 0]);

    /// 灰色. 未知类别的标注颜色.
    pub const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

    /// 黑色. 图例查不到时使用.
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    /// 标注框线宽 (缩略图像素).
    pub const OUTLINE_WIDTH: u32 = 2;
}

/// 20 类图例. 仅用于可视化, 分类器本身只输出其中前 4 类.
pub mod legend {
    use image::Rgb;

    /// (类名, RGB) 表, 顺序即图例展示顺序.
    pub const CLASS_COLORS: [(&str, [u8; 3]); 20] = [
        ("Tumor Cells", [0xFF, 0x00, 0x00]),
        ("Mitosis", [0x00, 0x00, 0xFF]),
        ("Karyorrhexis", [0x00, 0xFF, 0x00]),
        ("Stroma", [0xFF, 0xFF, 0x00]),
        ("Karyolysis", [0xFF, 0xA5, 0x00]),
        ("Necrosis", [0x80, 0x00, 0x80]),
        ("Inflammatory Cells", [0xFF, 0xFF, 0xFF]),
        ("Blood Vessels", [0x8B, 0x00, 0x00]),
        ("Fibroblasts", [0x46, 0x82, 0xB4]),
        ("Macrophages", [0xFF, 0x45, 0x00]),
        ("Epithelial Cells", [0x99, 0x32, 0xCC]),
        ("Lymphocytes", [0xDC, 0x14, 0x3C]),
        ("Endothelial Cells", [0xFF, 0xD7, 0x00]),
        ("Connective Tissue", [0x32, 0xCD, 0x32]),
        ("Basement Membrane", [0xD2, 0x69, 0x1E]),
        ("Apoptotic Bodies", [0xDC, 0xDC, 0xDC]),
        ("Cytoplasmic Fragments", [0x80, 0x00, 0x80]),
        ("Granulocytes", [0x1E, 0x90, 0xFF]),
        ("Mast Cells", [0xFF, 0x8C, 0x00]),
        ("Adipose Tissue", [0xFF, 0xFF, 0x00]),
    ];

    /// 查询图例颜色. 不在表中的类名返回 `None`, 调用方通常退回 [`super::color::BLACK`].
    pub fn legend_color(name: &str) -> Option<Rgb<u8>> {
        CLASS_COLORS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, rgb)| Rgb(*rgb))
    }

}
