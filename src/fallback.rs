use crate::dictionary::FlatDictionary;

pub const TERMS: &[(&str, &str)] = &[
    ("File", "文件"),
    ("Edit", "编辑"),
    ("View", "视图"),
    ("Window", "窗口"),
    ("Help", "帮助"),
    ("Settings", "设置"),
    ("Preferences", "偏好设置"),
    ("Open", "打开"),
    ("Save", "保存"),
    ("Save As", "另存为"),
    ("Close", "关闭"),
    ("Quit", "退出"),
    ("Undo", "撤销"),
    ("Redo", "重做"),
    ("Cut", "剪切"),
    ("Copy", "复制"),
    ("Paste", "粘贴"),
    ("Delete", "删除"),
    ("Select All", "全选"),
    ("Search", "搜索"),
    ("Cancel", "取消"),
    ("OK", "确定"),
    ("Yes", "是"),
    ("No", "否"),
    ("Apply", "应用"),
    ("Reset", "重置"),
    ("Loading...", "加载中..."),
    ("Error", "错误"),
    ("Warning", "警告"),
    ("About", "关于"),
];

pub fn dictionary() -> FlatDictionary {
    FlatDictionary::from_pairs(TERMS.iter().copied())
}
