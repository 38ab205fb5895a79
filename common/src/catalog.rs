//! 分類カタログモジュール
//!
//! HTSコードと重み付きトリガー語の参照テーブル。
//! 起動時に一度だけ構築し、以後は読み取り専用で複数リクエストから共有する。

use crate::error::{Error, Result};
use crate::types::{CatalogEntry, TriggerTerm, WeightClass};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

lazy_static! {
    static ref CODE_PATTERN: Regex = Regex::new(r"^\d{4}(\.\d{2,4}){0,3}$").unwrap();
}

/// コード形式チェック（例: "6109.10.00", "9999.00.0000"）
pub fn is_valid_code(code: &str) -> bool {
    CODE_PATTERN.is_match(code.trim())
}

/// 分類カタログ
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    /// コード → entries のインデックス
    index: HashMap<String, usize>,
}

impl Catalog {
    /// エントリ列からカタログを構築（コード形式・重複を検証）
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            if !is_valid_code(&entry.code) {
                return Err(Error::Catalog(format!("不正なコード形式: {}", entry.code)));
            }
            if index.insert(entry.code.trim().to_string(), i).is_some() {
                return Err(Error::Catalog(format!("重複コード: {}", entry.code)));
            }
        }

        Ok(Self { entries, index })
    }

    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// JSONファイルから読み込み
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// 組み込みカタログ
    pub fn builtin() -> Self {
        let entries = builtin_entries();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.code.clone(), i))
            .collect();
        Self { entries, index }
    }

    /// 宣言順のエントリ一覧
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, code: &str) -> Option<&CatalogEntry> {
        self.index.get(code.trim()).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// 組み込みエントリの定義用
struct EntryDef {
    code: &'static str,
    description: &'static str,
    category: &'static str,
    tariff_rate_hint: &'static str,
    product_types: &'static [&'static str],
    materials: &'static [&'static str],
    categories: &'static [&'static str],
    general: &'static [&'static str],
}

impl EntryDef {
    fn build(&self) -> CatalogEntry {
        let classes = [
            (self.product_types, WeightClass::ProductType),
            (self.materials, WeightClass::Material),
            (self.categories, WeightClass::Category),
            (self.general, WeightClass::General),
        ];
        let trigger_terms = classes
            .iter()
            .flat_map(|(terms, class)| terms.iter().map(move |t| TriggerTerm::new(*t, *class)))
            .collect();

        CatalogEntry {
            code: self.code.to_string(),
            description: self.description.to_string(),
            category: self.category.to_string(),
            trigger_terms,
            tariff_rate_hint: self.tariff_rate_hint.to_string(),
        }
    }
}

// 宣言順は同点時の並び順になる
const BUILTIN: &[EntryDef] = &[
    EntryDef {
        code: "6912.00.48",
        description: "Ceramic tableware and kitchenware, other than porcelain or china",
        category: "Ceramics",
        tariff_rate_hint: "9.8%",
        product_types: &["mug", "cup", "bowl", "plate", "saucer", "teapot"],
        materials: &["ceramic", "stoneware", "earthenware"],
        categories: &["kitchen", "dining", "tableware"],
        general: &["coffee", "tea", "handmade", "glazed", "dishwasher"],
    },
    EntryDef {
        code: "6911.10.80",
        description: "Tableware and kitchenware of porcelain or china",
        category: "Ceramics",
        tariff_rate_hint: "20.8%",
        product_types: &["mug", "teacup", "plate", "saucer", "dinnerware"],
        materials: &["porcelain", "china", "bone china"],
        categories: &["kitchen", "dining", "tableware"],
        general: &["fine", "gift", "set"],
    },
    EntryDef {
        code: "6109.10.00",
        description: "T-shirts, singlets, tank tops and similar garments, knitted or crocheted, of cotton",
        category: "Apparel",
        tariff_rate_hint: "16.5%",
        product_types: &["t-shirt", "tee", "tank top", "singlet", "shirt"],
        materials: &["cotton"],
        categories: &["apparel", "clothing", "fashion"],
        general: &["casual", "crew neck", "short sleeve", "graphic", "unisex"],
    },
    EntryDef {
        code: "6110.20.20",
        description: "Sweaters, pullovers, sweatshirts and similar articles, knitted or crocheted, of cotton",
        category: "Apparel",
        tariff_rate_hint: "16.5%",
        product_types: &["sweater", "pullover", "sweatshirt", "hoodie", "cardigan"],
        materials: &["cotton", "fleece"],
        categories: &["apparel", "clothing", "fashion"],
        general: &["warm", "knit", "winter", "zip"],
    },
    EntryDef {
        code: "6204.62.40",
        description: "Women's trousers, breeches and shorts, of cotton",
        category: "Apparel",
        tariff_rate_hint: "16.6%",
        product_types: &["trousers", "pants", "jeans", "shorts"],
        materials: &["cotton", "denim"],
        categories: &["apparel", "clothing", "fashion"],
        general: &["women", "slim", "fit", "high waist"],
    },
    EntryDef {
        code: "6403.99.90",
        description: "Footwear with outer soles of rubber or plastics and uppers of leather",
        category: "Footwear",
        tariff_rate_hint: "10%",
        product_types: &["shoe", "boot", "sneaker", "loafer", "sandal"],
        materials: &["leather", "suede"],
        categories: &["footwear", "shoes"],
        general: &["walking", "running", "lace up", "size"],
    },
    EntryDef {
        code: "4202.31.60",
        description: "Wallets and similar articles carried in the pocket, with outer surface of leather",
        category: "Bags & Accessories",
        tariff_rate_hint: "8%",
        product_types: &["wallet", "card holder", "billfold", "coin purse"],
        materials: &["leather"],
        categories: &["accessories", "bags"],
        general: &["slim", "rfid", "pocket", "bifold"],
    },
    EntryDef {
        code: "4202.22.15",
        description: "Handbags with outer surface of plastic sheeting or textile materials",
        category: "Bags & Accessories",
        tariff_rate_hint: "16.8%",
        product_types: &["handbag", "tote", "backpack", "shoulder bag"],
        materials: &["polyester", "nylon", "canvas"],
        categories: &["bags", "accessories", "luggage"],
        general: &["travel", "zipper", "school", "large"],
    },
    EntryDef {
        code: "8518.30.20",
        description: "Headphones and earphones, whether or not combined with a microphone",
        category: "Electronics",
        tariff_rate_hint: "Free",
        product_types: &["headphones", "earphones", "earbuds", "headset"],
        materials: &[],
        categories: &["electronics", "audio"],
        general: &["wireless", "bluetooth", "noise cancelling", "stereo"],
    },
    EntryDef {
        code: "8504.40.95",
        description: "Static converters such as power adapters and chargers",
        category: "Electronics",
        tariff_rate_hint: "Free",
        product_types: &["charger", "power adapter", "power supply"],
        materials: &[],
        categories: &["electronics"],
        general: &["usb", "fast charging", "wall", "cable"],
    },
    EntryDef {
        code: "8471.30.01",
        description: "Portable automatic data processing machines weighing not more than 10 kg",
        category: "Electronics",
        tariff_rate_hint: "Free",
        product_types: &["laptop", "notebook computer", "tablet", "chromebook"],
        materials: &[],
        categories: &["electronics", "computers"],
        general: &["screen", "inch", "ssd", "ram"],
    },
    EntryDef {
        code: "9403.60.80",
        description: "Other wooden furniture",
        category: "Furniture",
        tariff_rate_hint: "Free",
        product_types: &["table", "chair", "shelf", "bookcase", "cabinet", "desk", "stool"],
        materials: &["wood", "wooden", "oak", "pine", "bamboo"],
        categories: &["furniture", "home"],
        general: &["living room", "storage", "drawer", "bedroom"],
    },
    EntryDef {
        code: "9403.20.00",
        description: "Other metal furniture",
        category: "Furniture",
        tariff_rate_hint: "Free",
        product_types: &["table", "chair", "shelf", "rack", "desk", "cabinet"],
        materials: &["metal", "steel", "iron", "aluminum"],
        categories: &["furniture", "home", "office"],
        general: &["storage", "folding", "industrial"],
    },
    EntryDef {
        code: "9503.00.00",
        description: "Toys, puzzles and reduced-size scale models",
        category: "Toys",
        tariff_rate_hint: "Free",
        product_types: &["toy", "puzzle", "doll", "action figure", "building block"],
        materials: &["plastic", "plush"],
        categories: &["toys", "kids", "games"],
        general: &["children", "educational", "ages", "gift"],
    },
    EntryDef {
        code: "3924.10.40",
        description: "Tableware and kitchenware of plastics",
        category: "Kitchenware",
        tariff_rate_hint: "3.4%",
        product_types: &["food container", "cutting board", "lunch box", "plate", "bowl", "cup"],
        materials: &["plastic", "silicone", "melamine"],
        categories: &["kitchen", "dining"],
        general: &["reusable", "bpa free", "microwave", "lid"],
    },
    EntryDef {
        code: "7013.37.50",
        description: "Drinking glasses, other than of glass-ceramics or lead crystal",
        category: "Glassware",
        tariff_rate_hint: "7.2%",
        product_types: &["drinking glass", "tumbler", "wine glass", "glass"],
        materials: &["glass", "borosilicate"],
        categories: &["kitchen", "barware", "dining"],
        general: &["set", "clear", "stemless"],
    },
    EntryDef {
        code: "7323.93.00",
        description: "Table, kitchen or other household articles of stainless steel",
        category: "Kitchenware",
        tariff_rate_hint: "2%",
        product_types: &["pot", "pan", "kettle", "water bottle", "flask", "tumbler"],
        materials: &["stainless steel", "steel"],
        categories: &["kitchen", "cookware"],
        general: &["insulated", "vacuum", "induction"],
    },
    EntryDef {
        code: "7117.19.90",
        description: "Imitation jewelry of base metal",
        category: "Jewelry",
        tariff_rate_hint: "11%",
        product_types: &["necklace", "bracelet", "earring", "ring", "pendant"],
        materials: &["brass", "alloy", "base metal", "zinc"],
        categories: &["jewelry", "accessories"],
        general: &["fashion", "chain", "gold plated", "charm"],
    },
    EntryDef {
        code: "3304.99.50",
        description: "Beauty or make-up preparations and preparations for the care of the skin",
        category: "Cosmetics",
        tariff_rate_hint: "Free",
        product_types: &["lotion", "cream", "serum", "lipstick", "moisturizer", "foundation"],
        materials: &[],
        categories: &["beauty", "cosmetics", "skincare"],
        general: &["face", "skin", "spf", "hydrating"],
    },
    EntryDef {
        code: "9506.91.00",
        description: "Articles and equipment for general physical exercise or gymnastics",
        category: "Sporting Goods",
        tariff_rate_hint: "4.6%",
        product_types: &["dumbbell", "yoga mat", "resistance band", "kettlebell"],
        materials: &["rubber", "neoprene", "foam"],
        categories: &["sports", "fitness"],
        general: &["workout", "gym", "exercise", "training"],
    },
    EntryDef {
        code: "9405.21.00",
        description: "Electric table, desk, bedside or floor-standing luminaires",
        category: "Lighting",
        tariff_rate_hint: "3.9%",
        product_types: &["lamp", "desk lamp", "floor lamp", "light fixture"],
        materials: &[],
        categories: &["lighting", "home"],
        general: &["led", "bulb", "dimmable"],
    },
    EntryDef {
        code: "4820.10.20",
        description: "Diaries, notebooks and address books",
        category: "Stationery",
        tariff_rate_hint: "Free",
        product_types: &["notebook", "journal", "diary", "planner"],
        materials: &["paper"],
        categories: &["stationery", "office"],
        general: &["ruled", "lined", "hardcover", "a5"],
    },
    EntryDef {
        code: "6302.60.00",
        description: "Toilet linen and kitchen linen, of terry toweling, of cotton",
        category: "Home Textiles",
        tariff_rate_hint: "9.1%",
        product_types: &["towel", "washcloth", "bath towel"],
        materials: &["cotton"],
        categories: &["bath", "home"],
        general: &["absorbent", "soft", "quick dry"],
    },
];

fn builtin_entries() -> Vec<CatalogEntry> {
    BUILTIN.iter().map(EntryDef::build).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin();
        assert!(!catalog.is_empty());
        // from_entries と同じ検証を通ること
        let validated = Catalog::from_entries(catalog.entries().to_vec());
        assert!(validated.is_ok());
    }

    #[test]
    fn test_get_by_code() {
        let catalog = Catalog::builtin();
        let entry = catalog.get("6109.10.00").expect("エントリが見つからない");
        assert_eq!(entry.category, "Apparel");
        assert!(entry
            .trigger_terms
            .iter()
            .any(|t| t.term == "cotton" && t.weight_class == WeightClass::Material));
        assert!(catalog.get(" 6109.10.00 ").is_some());
        assert!(catalog.get("0000.00.00").is_none());
    }

    #[test]
    fn test_is_valid_code() {
        assert!(is_valid_code("6109.10.00"));
        assert!(is_valid_code("9999.00.0000"));
        assert!(is_valid_code("6109"));
        assert!(!is_valid_code("61.09"));
        assert!(!is_valid_code("abcd.10.00"));
        assert!(!is_valid_code(""));
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {
                "code": "6912.00.48",
                "description": "Ceramic tableware",
                "category": "Ceramics",
                "triggerTerms": [
                    {"term": "mug", "weightClass": "productType"},
                    {"term": "ceramic", "weightClass": "material"}
                ]
            }
        ]"#;

        let catalog = Catalog::from_json(json).expect("読み込み失敗");
        assert_eq!(catalog.len(), 1);
        let entry = catalog.get("6912.00.48").unwrap();
        assert_eq!(entry.trigger_terms.len(), 2);
        assert_eq!(entry.tariff_rate_hint, ""); // デフォルト値
    }

    #[test]
    fn test_from_json_rejects_duplicate_codes() {
        let json = r#"[
            {"code": "6912.00.48", "description": "a", "category": "c", "triggerTerms": []},
            {"code": "6912.00.48", "description": "b", "category": "c", "triggerTerms": []}
        ]"#;

        let result = Catalog::from_json(json);
        assert!(matches!(result, Err(Error::Catalog(_))));
    }

    #[test]
    fn test_from_json_rejects_invalid_code() {
        let json = r#"[{"code": "mug", "description": "a", "category": "c", "triggerTerms": []}]"#;
        assert!(matches!(Catalog::from_json(json), Err(Error::Catalog(_))));
    }
}
