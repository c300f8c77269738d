//! 稠密單純形表
//!
//! 列主序存放，每列最後一格為右側值。另外維護一條縮減成本列，最後一格為 -z。

pub(crate) struct Tableau {
    rows: usize,
    width: usize,
    data: Vec<f64>,
    basis: Vec<usize>,
    costs: Vec<f64>,
}

impl Tableau {
    /// `columns` 不含右側值欄
    pub fn new(rows: usize, columns: usize) -> Self {
        let width = columns + 1;
        Self {
            rows,
            width,
            data: vec![0.0; rows * width],
            basis: vec![0; rows],
            costs: vec![0.0; width],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.width - 1
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.data[row * self.width + column]
    }

    pub fn set(&mut self, row: usize, column: usize, value: f64) {
        self.data[row * self.width + column] = value;
    }

    pub fn rhs(&self, row: usize) -> f64 {
        self.data[row * self.width + self.width - 1]
    }

    pub fn set_rhs(&mut self, row: usize, value: f64) {
        let rhs = self.width - 1;
        self.set(row, rhs, value);
    }

    pub fn basis(&self) -> &[usize] {
        &self.basis
    }

    pub fn set_basic(&mut self, row: usize, column: usize) {
        self.basis[row] = column;
    }

    /// 載入一組成本並換算為目前基底下的縮減成本
    pub fn load_costs(&mut self, cost: &[f64]) {
        self.costs.clear();
        self.costs.extend_from_slice(cost);
        self.costs.resize(self.width, 0.0);

        for row in 0..self.rows {
            let cb = cost[self.basis[row]];
            if cb == 0.0 {
                continue;
            }
            let start = row * self.width;
            for (d, a) in self.costs.iter_mut().zip(&self.data[start..start + self.width]) {
                *d -= cb * a;
            }
        }
    }

    /// 目前基底解的目標值（以載入的成本計）
    pub fn objective(&self) -> f64 {
        -self.costs[self.width - 1]
    }

    /// 縮減成本最負的欄（平手取最小索引）；全部 ≥ -ε 時回傳 None
    pub fn entering_column(&self, blocked: &[bool], tolerance: f64) -> Option<usize> {
        let mut best = -tolerance;
        let mut entering = None;
        for (column, &d) in self.costs[..self.width - 1].iter().enumerate() {
            if d < best && !blocked[column] {
                best = d;
                entering = Some(column);
            }
        }
        entering
    }

    /// 最小比值檢定（平手取最小列索引）；沒有正係數時回傳 None
    pub fn leaving_row(&self, column: usize, tolerance: f64) -> Option<usize> {
        let mut best = f64::INFINITY;
        let mut leaving = None;
        for row in 0..self.rows {
            let a = self.get(row, column);
            if a > tolerance {
                let ratio = self.rhs(row) / a;
                if ratio < best - tolerance {
                    best = ratio;
                    leaving = Some(row);
                }
            }
        }
        leaving
    }

    /// 列中第一個絕對值大於 ε 且未被封鎖的欄
    pub fn first_usable_column(&self, row: usize, blocked: &[bool], tolerance: f64) -> Option<usize> {
        (0..self.columns()).find(|&column| !blocked[column] && self.get(row, column).abs() > tolerance)
    }

    pub fn pivot(&mut self, row: usize, column: usize) {
        let width = self.width;
        let start = row * width;
        let p = self.data[start + column];
        for v in &mut self.data[start..start + width] {
            *v /= p;
        }
        self.data[start + column] = 1.0;

        // 只走樞紐列的非零格
        let pivot_row: Vec<(usize, f64)> = self.data[start..start + width]
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(j, v)| (j, *v))
            .collect();

        for other in 0..self.rows {
            if other == row {
                continue;
            }
            let offset = other * width;
            let factor = self.data[offset + column];
            if factor == 0.0 {
                continue;
            }
            let target = &mut self.data[offset..offset + width];
            for &(j, v) in &pivot_row {
                target[j] -= factor * v;
            }
            target[column] = 0.0;
        }

        let factor = self.costs[column];
        if factor != 0.0 {
            for &(j, v) in &pivot_row {
                self.costs[j] -= factor * v;
            }
            self.costs[column] = 0.0;
        }

        self.basis[row] = column;
    }

    /// 每一欄在目前基底解下的值
    pub fn column_values(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.columns()];
        for (row, &column) in self.basis.iter().enumerate() {
            values[column] = self.rhs(row);
        }
        values
    }
}
